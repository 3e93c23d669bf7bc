pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a typed input from `--input`, else from piped stdin. `Ok(None)` when
/// neither is present.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_input(path)?));
    }
    stdin::read_stdin()
}
