// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    create_configuration_assets, format_remediation_summary, load_urls_from_file,
    load_urls_from_source, parse_url_line, render_dashboard, resolve_format, select_report,
};
