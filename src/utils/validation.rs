use crate::utils::error::{QfError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Parameter names end up inside `name=value` lists separated by commas,
/// so neither separator nor whitespace may appear in them.
pub fn validate_parameter_name(field_name: &str, name: &str) -> Result<()> {
    validate_non_empty_string(field_name, name)?;

    if let Some(bad) = name.chars().find(|c| *c == ',' || *c == '=' || c.is_whitespace()) {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: format!("Parameter names cannot contain {:?}", bad),
        });
    }
    Ok(())
}

pub fn validate_ordered_bounds(field_name: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("[{}, {}]", min, max),
            reason: "Lower bound must be finite and strictly below the upper bound".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(QfError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_parameter_name() {
        assert!(validate_parameter_name("scan_pois", "cHWtil_combine").is_ok());
        assert!(validate_parameter_name("scan_pois", "").is_err());
        assert!(validate_parameter_name("scan_pois", "mu,ggF").is_err());
        assert!(validate_parameter_name("scan_pois", "mu=1").is_err());
        assert!(validate_parameter_name("scan_pois", "mu ggF").is_err());
    }

    #[test]
    fn test_validate_ordered_bounds() {
        assert!(validate_ordered_bounds("float_pois.mu", -5.0, 5.0).is_ok());
        assert!(validate_ordered_bounds("float_pois.mu", 5.0, 5.0).is_err());
        assert!(validate_ordered_bounds("float_pois.mu", f64::NAN, 5.0).is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("scan_ranges.n_points", 5, 1).is_ok());
        assert!(validate_positive_number("scan_ranges.n_points", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("quickfit_defaults.minos", 1, 0, 1).is_ok());
        assert!(validate_range("quickfit_defaults.minos", 2, 0, 1).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("workspaces.linear_obs.path", "ws/comb.root").is_ok());
        assert!(validate_path("workspaces.linear_obs.path", "").is_err());
    }
}
