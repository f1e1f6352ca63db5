use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads up to `max_urls` URLs from a file, one per line
///
/// Blank lines are skipped and surrounding whitespace is trimmed. No URL
/// validation happens here; invalid entries are dropped later by the scheduler.
///
/// # Arguments
///
/// * `path` - Path to the URL list
/// * `max_urls` - Maximum number of URLs to return
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The URLs in file order
/// * `Err(std::io::Error)` - The file could not be opened or read
pub fn read_url_list(path: &Path, max_urls: usize) -> std::io::Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);

    let mut urls = Vec::new();
    for line in reader.lines() {
        if urls.len() >= max_urls {
            break;
        }
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            urls.push(trimmed.to_string());
        }
    }

    Ok(urls)
}
