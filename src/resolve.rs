//! Collision-free destination names: `report.pdf`, `report (1).pdf`, ...

use crate::error::Result;

/// Split `path` into (stem, extension). The extension is the last `.suffix` of
/// the final component; leading dots of the name (`.bashrc`) never start one.
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path
        .rfind(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
        .map_or(0, |i| i + 1);
    let name = &path[name_start..];
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(dot) => path.split_at(name_start + leading + dot),
        None => (path, ""),
    }
}

/// First of `candidate`, `stem (1)ext`, `stem (2)ext`, ... that `exists`
/// reports as free.
///
/// Directories are numbered the same way as files, so a folder called
/// `archive.zip` becomes `archive (1).zip`. A directory candidate may carry a
/// trailing separator, which is dropped.
pub fn resolve<F>(candidate: &str, is_directory: bool, mut exists: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    let candidate = if is_directory && candidate.len() > 1 {
        candidate.trim_end_matches(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
    } else {
        candidate
    };
    let (stem, ext) = split_extension(candidate);

    if !exists(candidate)? {
        return Ok(candidate.to_string());
    }
    let mut n: u64 = 1;
    loop {
        let attempt = format!("{} ({}){}", stem, n, ext);
        if !exists(&attempt)? {
            return Ok(attempt);
        }
        n += 1;
    }
}
