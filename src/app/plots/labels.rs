// Axis labels for the CP-odd Wilson coefficients; anything else prints as-is.

const LABELS: &[(&str, &str)] = &[
    ("cHWtil_combine", "c̃HW"),
    ("cHBtil_combine", "c̃HB"),
    ("cHWBtil_combine", "c̃HWB"),
    ("chwtilde", "c̃HW"),
    ("chbtilde", "c̃HB"),
    ("chbwtilde", "c̃HWB"),
];

pub fn poi_label(name: &str) -> String {
    LABELS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poi_label() {
        assert_eq!(poi_label("cHWBtil_combine"), "c̃HWB");
        assert_eq!(poi_label("mu_ggF"), "mu_ggF");
    }
}
