// Diagnostic plots of scan outputs, rendered to SVG.

pub mod data;
pub mod grid;
pub mod labels;
pub mod profile;
pub mod render;
pub mod scan_table;

pub use data::{
    load_fit_summary, load_profile_points, load_profiled_points, parse_labelled_input,
    ProfilePoint, ProfiledPoint,
};
pub use grid::Grid2d;
pub use labels::poi_label;
pub use profile::{profile_1d, Interval, Profile1d};
pub use render::{plot_fit_summary, plot_profile, plot_profiled_2d, plot_scan_1d, plot_scan_2d};
pub use scan_table::{read_scan_table, ScanTable};
