//! Output formats for the dashboard view.

pub mod html;
pub mod terminal;

pub use self::html::render_dashboard_page;
pub use self::terminal::render_dashboard_text;
