/// A Plex library section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub key: String,
    pub title: String,
    /// Plex section type (`movie`, `show`, `artist`, ...)
    pub kind: String,
}

/// A collection inside a library, fetched fresh on every pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub rating_key: String,
    pub title: String,
    /// Title of the library the collection lives in
    pub library: String,
    pub member_count: u32,
}

/// A movie and the file backing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub rating_key: String,
    pub title: String,
    /// Path of the first media part, if Plex reports one
    pub file: Option<String>,
    pub library: String,
    /// Section key, needed to edit the movie
    pub library_key: String,
}

impl Collection {
    /// Check if the collection has fewer members than `minimum`
    pub fn is_undersized(&self, minimum: u32) -> bool {
        self.member_count < minimum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_undersized() {
        let collection = Collection {
            rating_key: "1".to_string(),
            title: "Rocky".to_string(),
            library: "Movies".to_string(),
            member_count: 1,
        };

        assert!(collection.is_undersized(2));
        assert!(!collection.is_undersized(1));
        assert!(!collection.is_undersized(0));
    }
}
