/// One downloadable file belonging to a cycle.
///
/// `index` is the position of the feature in the catalog response. It decides
/// which files survive a `--limit-files` truncation and the order in which the
/// downloaded files are handed to the filter stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    index: usize,
    url: String,
    file_name: String,
}

impl Asset {
    /// Returns `None` when the URL has no path segment to name the local file after.
    pub fn new(index: usize, url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let file_name = file_name_from_url(&url)?;
        Some(Self {
            index,
            url,
            file_name,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Local name of the file: the last path segment, query and fragment removed.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let without_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    // Everything before the first slash is the authority.
    let (_, path) = without_scheme.split_once('/')?;
    let name = path.rsplit('/').next()?;

    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}
