//! Template content for the generated `debian/` directory.

macro_rules! template {
  ($path:literal) => {
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $path))
  };
}

pub const CONTROL: &str = template!("control");

pub const RULES: &str = template!("rules");

pub const COMPAT: &str = template!("compat");

/// Rendered once per menu item with `title`, `directory` and `start_page` set
pub const MENU_DESKTOP: &str = template!("menu.desktop");

pub const MENU_DIRECTORY: &str = template!("menu.directory");

/// XDG menu merge file placing the package's entries in their own submenu
pub const MERGE_MENU: &str = template!("merge.menu");

pub const SOURCE_FORMAT: &str = template!("source/format");

pub const SOURCE_OPTIONS: &str = template!("source/options");

pub const SOURCE_INCLUDE_BINARIES: &str = template!("source/include-binaries");
