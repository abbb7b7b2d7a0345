//! Builds the comma-separated `-p` argument handed to quickFit.
//!
//! Scan POIs are the combination-level coefficients, channel POIs their
//! per-channel counterparts. Which of them float, which are pinned and at
//! what value depends on the kind of scan.

use crate::config::{AnalysisConfig, RangeSpec};
use crate::domain::model::Seeds;
use crate::utils::format::{fmt_number, fmt_poi_value};
use std::collections::BTreeMap;

const SCAN_POI_SEED: f64 = 0.0;
const SCAN_POI_BOUND: f64 = 3.0;
const CHANNEL_POI_SEED: f64 = 1.0;
const CHANNEL_POI_BOUND: f64 = 5.0;

pub struct PoiBuilder<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> PoiBuilder<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// One scanned POI pinned at `value`.
    ///
    /// Scanning a combination POI floats the other scan POIs and pins channel
    /// POIs at 1. Scanning a channel POI does the reverse.
    pub fn build_1d_scan(
        &self,
        scan_poi: &str,
        value: f64,
        seeds: &Seeds,
        fix_other_scan_pois: bool,
    ) -> String {
        self.build_grid_point(&[(scan_poi, value)], seeds, fix_other_scan_pois)
    }

    pub fn build_2d_scan(
        &self,
        poi1: &str,
        value1: f64,
        poi2: &str,
        value2: f64,
        seeds: &Seeds,
        fix_other_scan_pois: bool,
    ) -> String {
        self.build_grid_point(&[(poi1, value1), (poi2, value2)], seeds, fix_other_scan_pois)
    }

    fn build_grid_point(&self, scanned: &[(&str, f64)], seeds: &Seeds, fix_others: bool) -> String {
        let scanned_value = |name: &str| {
            scanned
                .iter()
                .find(|(poi, _)| *poi == name)
                .map(|(_, value)| *value)
        };
        let scanning_combine = scanned.iter().any(|(poi, _)| self.config.is_scan_poi(poi));

        let mut pois = Vec::new();

        for poi in &self.config.scan_pois {
            if let Some(value) = scanned_value(poi) {
                pois.push(pinned(poi, value));
            } else if scanning_combine {
                if fix_others {
                    pois.push(format!("{}=0", poi));
                } else {
                    pois.push(floating(poi, seed(seeds, poi, SCAN_POI_SEED), SCAN_POI_BOUND));
                }
            } else {
                pois.push(format!("{}=1", poi));
            }
        }

        for poi in &self.config.channel_pois {
            if let Some(value) = scanned_value(poi) {
                if !self.config.is_scan_poi(poi) {
                    pois.push(pinned(poi, value));
                }
            } else if scanning_combine {
                pois.push(format!("{}=1", poi));
            } else {
                pois.push(floating(
                    poi,
                    seed(seeds, poi, CHANNEL_POI_SEED),
                    CHANNEL_POI_BOUND,
                ));
            }
        }

        for poi in &self.config.float_pois {
            if self.is_coefficient(&poi.name) || scanned_value(&poi.name).is_some() {
                continue;
            }
            pois.push(poi.to_quickfit_str(Some(seed(seeds, &poi.name, poi.default))));
        }

        self.push_fixed(&mut pois);
        pois.join(",")
    }

    /// Unconditional fit: scan POIs float inside their configured range,
    /// channel POIs stay at 1.
    pub fn build_fit(&self, ranges: &BTreeMap<String, RangeSpec>, seeds: &Seeds) -> String {
        let mut pois = Vec::new();

        for poi in &self.config.scan_pois {
            let range = ranges.get(poi);
            let min = range.and_then(|r| r.min).unwrap_or(-SCAN_POI_BOUND);
            let max = range.and_then(|r| r.max).unwrap_or(SCAN_POI_BOUND);
            pois.push(format!(
                "{}={}_{}_{}",
                poi,
                fmt_poi_value(seed(seeds, poi, SCAN_POI_SEED)),
                fmt_number(min),
                fmt_number(max)
            ));
        }

        for poi in &self.config.channel_pois {
            pois.push(format!("{}=1", poi));
        }

        for poi in &self.config.float_pois {
            if self.is_coefficient(&poi.name) {
                continue;
            }
            pois.push(poi.to_quickfit_str(Some(seed(seeds, &poi.name, poi.default))));
        }

        self.push_fixed(&mut pois);
        pois.join(",")
    }

    /// Scan of a single per-channel coefficient declared among `float_pois`.
    pub fn build_channel_scan(&self, channel_poi: &str, value: f64, seeds: &Seeds) -> String {
        let mut pois: Vec<String> = self
            .config
            .scan_pois
            .iter()
            .map(|poi| format!("{}=1", poi))
            .collect();

        let mut scanned_listed = false;
        for poi in &self.config.float_pois {
            if poi.name == channel_poi {
                scanned_listed = true;
                pois.push(pinned(&poi.name, value));
            } else {
                pois.push(poi.to_quickfit_str(Some(seed(seeds, &poi.name, poi.default))));
            }
        }
        if !scanned_listed {
            pois.push(pinned(channel_poi, value));
        }

        pois.join(",")
    }

    /// 1D scan where only the scan POIs listed in `float_pois` float and the
    /// remaining ones are pinned at 0.
    pub fn build_variable_scan(
        &self,
        scanned_poi: &str,
        value: f64,
        float_pois: &[String],
        seeds: &Seeds,
    ) -> String {
        let mut pois = Vec::new();

        for poi in &self.config.scan_pois {
            if poi == scanned_poi {
                pois.push(pinned(poi, value));
            } else if float_pois.iter().any(|f| f == poi) {
                pois.push(floating(poi, seed(seeds, poi, SCAN_POI_SEED), SCAN_POI_BOUND));
            } else {
                pois.push(format!("{}=0", poi));
            }
        }

        for poi in &self.config.channel_pois {
            pois.push(format!("{}=1", poi));
        }

        for poi in &self.config.float_pois {
            if self.is_coefficient(&poi.name) {
                continue;
            }
            pois.push(poi.to_quickfit_str(Some(seed(seeds, &poi.name, poi.default))));
        }

        self.push_fixed(&mut pois);
        pois.join(",")
    }

    fn is_coefficient(&self, name: &str) -> bool {
        self.config.is_scan_poi(name) || self.config.is_channel_poi(name)
    }

    fn push_fixed(&self, pois: &mut Vec<String>) {
        for (name, value) in &self.config.fixed_pois {
            pois.push(format!("{}={}", name, fmt_number(*value)));
        }
    }
}

fn seed(seeds: &Seeds, name: &str, fallback: f64) -> f64 {
    seeds.get(name).copied().unwrap_or(fallback)
}

fn pinned(name: &str, value: f64) -> String {
    format!("{}={}", name, fmt_poi_value(value))
}

fn floating(name: &str, start: f64, bound: f64) -> String {
    format!(
        "{}={}_{}_{}",
        name,
        fmt_poi_value(start),
        fmt_number(-bound),
        fmt_number(bound)
    )
}

/// Parses `a=1,b=2` into seeds. Malformed pairs are skipped.
pub fn parse_seed_string(input: &str) -> Seeds {
    input
        .split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim().parse::<f64>().ok()?;
            Some((key.to_string(), value))
        })
        .collect()
}

/// Inverse of [`parse_seed_string`].
pub fn format_seed_string(seeds: &Seeds) -> String {
    seeds
        .iter()
        .map(|(name, value)| format!("{}={}", name, fmt_poi_value(*value)))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig::from_yaml_str(
            r#"
scan_pois: [cHWtil_combine, cHBtil_combine, cHWBtil_combine]
channel_pois: [cHWtil_HZZ, cHWtil_HWW]
float_pois:
  - {name: mu_ggF, default: 1, min: 0, max: 5}
  - cHWtil_HZZ
fixed_pois:
  mu_VBF: 1
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_1d_scan_of_combine_poi() {
        let config = config();
        let builder = PoiBuilder::new(&config);

        let pois = builder.build_1d_scan("cHWtil_combine", 0.5, &Seeds::new(), false);
        assert_eq!(
            pois,
            "cHWtil_combine=0.500000,\
             cHBtil_combine=0.000000_-3_3,\
             cHWBtil_combine=0.000000_-3_3,\
             cHWtil_HZZ=1,cHWtil_HWW=1,\
             mu_ggF=1_0_5,\
             mu_VBF=1"
        );
    }

    #[test]
    fn test_1d_scan_uses_seeds_and_fixing() {
        let config = config();
        let builder = PoiBuilder::new(&config);
        let seeds: Seeds = [
            ("cHBtil_combine".to_string(), 0.25),
            ("mu_ggF".to_string(), 1.1),
        ]
        .into_iter()
        .collect();

        let seeded = builder.build_1d_scan("cHWtil_combine", -1.0, &seeds, false);
        assert!(seeded.contains("cHBtil_combine=0.250000_-3_3"));
        assert!(seeded.contains("mu_ggF=1.1_0_5"));

        let fixed = builder.build_1d_scan("cHWtil_combine", -1.0, &seeds, true);
        assert!(fixed.contains("cHBtil_combine=0,"));
        assert!(fixed.contains("cHWBtil_combine=0,"));
    }

    #[test]
    fn test_1d_scan_of_channel_poi() {
        let config = config();
        let builder = PoiBuilder::new(&config);

        let pois = builder.build_1d_scan("cHWtil_HZZ", 2.0, &Seeds::new(), false);
        assert!(pois.starts_with("cHWtil_combine=1,cHBtil_combine=1,cHWBtil_combine=1,"));
        assert!(pois.contains("cHWtil_HZZ=2.000000"));
        assert!(pois.contains("cHWtil_HWW=1.000000_-5_5"));
        assert_eq!(pois.matches("cHWtil_HZZ").count(), 1);
    }

    #[test]
    fn test_2d_scan() {
        let config = config();
        let builder = PoiBuilder::new(&config);

        let pois =
            builder.build_2d_scan("cHWtil_combine", 0.5, "cHBtil_combine", -0.3, &Seeds::new(), false);
        assert!(pois.starts_with(
            "cHWtil_combine=0.500000,cHBtil_combine=-0.300000,cHWBtil_combine=0.000000_-3_3,"
        ));
        assert!(pois.ends_with("mu_VBF=1"));
    }

    #[test]
    fn test_fit_with_ranges() {
        let config = config();
        let builder = PoiBuilder::new(&config);
        let mut ranges = BTreeMap::new();
        ranges.insert(
            "cHWtil_combine".to_string(),
            RangeSpec {
                min: Some(-1.0),
                max: Some(1.5),
                n_points: None,
            },
        );

        let pois = builder.build_fit(&ranges, &Seeds::new());
        assert_eq!(
            pois,
            "cHWtil_combine=0.000000_-1_1.5,\
             cHBtil_combine=0.000000_-3_3,\
             cHWBtil_combine=0.000000_-3_3,\
             cHWtil_HZZ=1,cHWtil_HWW=1,\
             mu_ggF=1_0_5,\
             mu_VBF=1"
        );
    }

    #[test]
    fn test_channel_scan() {
        let config = config();
        let builder = PoiBuilder::new(&config);

        let pois = builder.build_channel_scan("cHWtil_HZZ", 0.75, &Seeds::new());
        assert_eq!(
            pois,
            "cHWtil_combine=1,cHBtil_combine=1,cHWBtil_combine=1,\
             mu_ggF=1_0_5,cHWtil_HZZ=0.750000"
        );

        let unlisted = builder.build_channel_scan("cHWtil_HWW", 0.5, &Seeds::new());
        assert!(unlisted.ends_with("cHWtil_HWW=0.500000"));
    }

    #[test]
    fn test_variable_scan() {
        let config = config();
        let builder = PoiBuilder::new(&config);

        let one_poi = builder.build_variable_scan("cHWtil_combine", 0.1, &[], &Seeds::new());
        assert!(one_poi.starts_with("cHWtil_combine=0.100000,cHBtil_combine=0,cHWBtil_combine=0,"));

        let two_poi = builder.build_variable_scan(
            "cHWtil_combine",
            0.1,
            &["cHBtil_combine".to_string()],
            &Seeds::new(),
        );
        assert!(two_poi.contains("cHBtil_combine=0.000000_-3_3"));
        assert!(two_poi.contains("cHWBtil_combine=0,"));
        assert!(two_poi.contains("cHWtil_HZZ=1,cHWtil_HWW=1"));
    }

    #[test]
    fn test_parse_seed_string() {
        let seeds = parse_seed_string("a=1, b = 2.5,broken,c=oops,=3,d=-0.25");
        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds["a"], 1.0);
        assert_eq!(seeds["b"], 2.5);
        assert_eq!(seeds["d"], -0.25);
        assert!(parse_seed_string("").is_empty());
    }

    #[test]
    fn test_format_seed_string() {
        let seeds = parse_seed_string("b=2,a=1");
        assert_eq!(format_seed_string(&seeds), "a=1.000000,b=2.000000");
    }
}
