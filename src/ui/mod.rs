pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, section, success, warn};
pub use progress::{finish_with_summary, Spinner};
pub use table::{counts_table, TableBuilder};
pub use theme::{theme, Theme};
