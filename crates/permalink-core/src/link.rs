use crate::entry::EntryKey;

/// Shareable URL for a dashboard permalink. Always embeds the key.
pub fn permalink_url(base_url: &str, key: &EntryKey) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/dashboard/p/{key}/")
}
