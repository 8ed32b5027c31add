use std::fs;
use std::path::Path;

/// Splits `name` into stem and last extension. A leading dot does not start an extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Whether anything occupies `path`, including a dangling symlink.
pub(crate) fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Returns `name`, or the first `stem_N.ext` for which `taken` is false.
pub(crate) fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }

    let (stem, ext) = split_extension(name);
    let mut counter: u64 = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Returns a file name that does not exist in `dir`.
///
/// `name` is returned unchanged when free; otherwise `_1`, `_2`, ... is inserted
/// before the extension and the lowest free counter wins.
pub fn unique_file_name(dir: &Path, name: &str) -> String {
    unique_name(name, |candidate| occupied(&dir.join(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_free_name_is_unchanged() {
        let tmp = tempdir().unwrap();
        assert_eq!(unique_file_name(tmp.path(), "a.txt"), "a.txt");
    }

    #[test]
    fn test_successive_collisions() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "").unwrap();
        assert_eq!(unique_file_name(tmp.path(), "a.txt"), "a_1.txt");

        fs::write(tmp.path().join("a_1.txt"), "").unwrap();
        assert_eq!(unique_file_name(tmp.path(), "a.txt"), "a_2.txt");
    }

    #[test]
    fn test_lowest_free_counter_wins() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "").unwrap();
        fs::write(tmp.path().join("a_2.txt"), "").unwrap();
        assert_eq!(unique_file_name(tmp.path(), "a.txt"), "a_1.txt");
    }

    #[test]
    fn test_no_extension_uses_whole_name() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("README"), "").unwrap();
        assert_eq!(unique_file_name(tmp.path(), "README"), "README_1");
    }

    #[test]
    fn test_extension_edge_cases() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", Some("gz")));
        assert_eq!(split_extension(".env"), (".env", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));

        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.tar.gz"), "").unwrap();
        assert_eq!(unique_file_name(tmp.path(), "a.tar.gz"), "a.tar_1.gz");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_counts_as_taken() {
        let tmp = tempdir().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("a.txt")).unwrap();
        assert!(!tmp.path().join("a.txt").exists());
        assert_eq!(unique_file_name(tmp.path(), "a.txt"), "a_1.txt");
    }

    #[test]
    fn test_unique_name_against_a_set() {
        let taken: HashSet<&str> = ["a.jpg", "a_1.jpg"].into_iter().collect();
        assert_eq!(unique_name("a.jpg", |n| taken.contains(n)), "a_2.jpg");
        assert_eq!(unique_name("b.jpg", |n| taken.contains(n)), "b.jpg");
    }
}
