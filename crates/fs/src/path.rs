//! Top-level path classification.
//!
//! Classification is total: every input maps to exactly one subtree. The
//! finer-grained shapes are parsed by the owning handler, which also decides
//! whether the identifiers inside the path are live.

/// The owner of a virtual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtree {
    Root,
    Models,
    Config,
    Conversations,
    Search,
    Other,
}

/// Classify an absolute path by its first component.
pub fn classify(path: &str) -> Subtree {
    match components(path).first() {
        None => Subtree::Root,
        Some(&"models") => Subtree::Models,
        Some(&"config") => Subtree::Config,
        Some(&"conversations") => Subtree::Conversations,
        Some(&"semantic_search") => Subtree::Search,
        Some(_) => Subtree::Other,
    }
}

/// Split a path into its non-empty components.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_path_gets_exactly_one_subtree() {
        assert_eq!(classify("/"), Subtree::Root);
        assert_eq!(classify(""), Subtree::Root);
        assert_eq!(classify("/models"), Subtree::Models);
        assert_eq!(classify("/models/gpt-x"), Subtree::Models);
        assert_eq!(classify("/config/default/settings.toml"), Subtree::Config);
        assert_eq!(classify("/conversations/latest/prompt"), Subtree::Conversations);
        assert_eq!(classify("/semantic_search/idx/corpus/a.txt"), Subtree::Search);
        assert_eq!(classify("/nope"), Subtree::Other);
        assert_eq!(classify("/modelsx/y"), Subtree::Other);
    }

    #[test]
    fn classification_ignores_duplicate_separators() {
        assert_eq!(classify("//models"), Subtree::Models);
        assert_eq!(classify("/models/"), Subtree::Models);
        assert_eq!(classify("///"), Subtree::Root);
    }

    #[test]
    fn components_drop_empty_segments() {
        assert_eq!(components("/a//b/"), vec!["a", "b"]);
        assert!(components("/").is_empty());
    }
}
