use std::{path::PathBuf, sync::LazyLock};

pub static DEFAULT_HAVEN_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Ok(explicit) = std::env::var("MODHAVEN_HOME") {
        return PathBuf::from(explicit);
    }

    let mut path = dirs::home_dir().unwrap_or_default();

    if std::env::var("MODHAVEN_XDG_PATH").is_ok() {
        path = dirs::config_dir().unwrap_or_else(|| path.join(".config"));
    }

    path.push("ModHaven");
    path
});

/// Computes a path inside the ModHaven data directory.
///
/// Returns a `&Path` referencing the data directory itself if no arguments are passed in, or a
/// `PathBuf` created by joining all of the arguments to the base directory if at least one
/// argument is passed in.
///
/// # Examples
///
/// ```ignore
/// // Assuming neither `MODHAVEN_HOME` nor `MODHAVEN_XDG_PATH` is set, the base is ~/ModHaven
/// assert_eq!(haven_path!("cache", "mods.json"), home.join("ModHaven/cache/mods.json"));
/// ```
#[macro_export]
macro_rules! haven_path {
    () => {
        $crate::paths::DEFAULT_HAVEN_PATH.as_path()
    };

    ( $( $path:expr ),+ $(,)? ) => {
        [
            $crate::paths::DEFAULT_HAVEN_PATH.as_path(),
            $( std::path::Path::new(&$path) ),+
        ].into_iter().collect::<std::path::PathBuf>()
    };
}
