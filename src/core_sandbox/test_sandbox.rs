// Tests for root containment and directory sizes

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scenario() -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), b"hello").unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("b").join("c.txt"), b"abc").unwrap();
        let sandbox = Sandbox::new(&root).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_root_must_be_directory() {
        let (dir, _) = scenario();
        let err = Sandbox::new(dir.path().join("data").join("a.txt")).unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRoot { .. }));
        let err = Sandbox::new(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, SandboxError::InvalidRoot { .. }));
    }

    #[test]
    fn test_resolve_child_and_parent() {
        let (_dir, sandbox) = scenario();
        let root = sandbox.root().to_path_buf();

        let b = sandbox.resolve(&root, "b").unwrap();
        assert_eq!(b, root.join("b"));

        let back = sandbox.resolve(&b, "..").unwrap();
        assert_eq!(back, root);

        let dotted = sandbox.resolve(&b, "./../b/./c.txt").unwrap();
        assert_eq!(dotted, root.join("b").join("c.txt"));
    }

    #[test]
    fn test_parent_of_root_is_violation() {
        let (_dir, sandbox) = scenario();
        let root = sandbox.root().to_path_buf();
        let err = sandbox.resolve(&root, "..").unwrap_err();
        assert!(err.is_violation());

        let b = root.join("b");
        let err = sandbox.resolve(&b, "../../..").unwrap_err();
        assert!(err.is_violation());
    }

    #[test]
    fn test_sibling_with_common_prefix_is_violation() {
        let (dir, sandbox) = scenario();
        fs::create_dir(dir.path().join("data2")).unwrap();
        fs::write(dir.path().join("data2").join("secret"), b"x").unwrap();

        let err = sandbox.resolve(sandbox.root(), "../data2").unwrap_err();
        assert!(err.is_violation());
        let err = sandbox.resolve(sandbox.root(), "../data2/secret").unwrap_err();
        assert!(err.is_violation());
    }

    #[test]
    fn test_absolute_candidate_is_rooted_in_sandbox() {
        let (_dir, sandbox) = scenario();
        let b = sandbox.root().join("b");
        let resolved = sandbox.resolve(&b, "/a.txt").unwrap();
        assert_eq!(resolved, sandbox.root().join("a.txt"));

        // "/etc" means <root>/etc, which does not exist.
        let err = sandbox.resolve(&b, "/etc").unwrap_err();
        assert!(matches!(err, SandboxError::NotFound(_)));
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let (_dir, sandbox) = scenario();
        let err = sandbox.resolve(sandbox.root(), "nope").unwrap_err();
        assert!(matches!(err, SandboxError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_violation() {
        let (dir, sandbox) = scenario();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("leak.txt"), b"leak").unwrap();
        std::os::unix::fs::symlink(&outside, sandbox.root().join("link")).unwrap();

        let err = sandbox.resolve(sandbox.root(), "link").unwrap_err();
        assert!(err.is_violation());
        let err = sandbox.resolve(sandbox.root(), "link/leak.txt").unwrap_err();
        assert!(err.is_violation());
    }

    #[test]
    fn test_display_name_is_last_segment() {
        let (_dir, sandbox) = scenario();
        let b = sandbox.root().join("b");
        assert_eq!(sandbox.display_name(&b), "b");
        assert_eq!(sandbox.display_name(sandbox.root()), "data");
    }

    #[test]
    fn test_directory_size_sums_nested_files() {
        let (_dir, sandbox) = scenario();
        let root = sandbox.root();
        assert_eq!(directory_size(&sandbox, &root.join("b")), 3);
        assert_eq!(directory_size(&sandbox, root), 8);

        let mut deep = root.join("b");
        for level in 0..64 {
            deep = deep.join(format!("d{}", level));
        }
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("tail.bin"), vec![0u8; 100]).unwrap();
        assert_eq!(directory_size(&sandbox, &root.join("b")), 103);
    }

    #[test]
    fn test_directory_size_of_empty_directory() {
        let (_dir, sandbox) = scenario();
        let empty = sandbox.root().join("empty");
        fs::create_dir(&empty).unwrap();
        assert_eq!(directory_size(&sandbox, &empty), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_size_ignores_links_leaving_root() {
        let (dir, sandbox) = scenario();
        fs::write(dir.path().join("secret.bin"), vec![0u8; 1000]).unwrap();
        let b = sandbox.root().join("b");
        std::os::unix::fs::symlink(dir.path().join("secret.bin"), b.join("leak")).unwrap();
        std::os::unix::fs::symlink(sandbox.root().join("a.txt"), b.join("alias")).unwrap();

        // `alias` stays inside and counts, `leak` does not.
        assert_eq!(directory_size(&sandbox, &b), 8);
    }

    #[tokio::test]
    async fn test_resolve_blocking_matches_resolve() {
        let (_dir, sandbox) = scenario();
        let root = sandbox.root().to_path_buf();
        let b = sandbox.resolve_blocking(&root, "b").await.unwrap();
        assert_eq!(b, root.join("b"));
        let err = sandbox.resolve_blocking(&root, "..").await.unwrap_err();
        assert!(err.is_violation());
    }
}
