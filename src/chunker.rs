/// Splits text into groups of at most `chunk_size` whitespace-separated words.
///
/// Each chunk is the words rejoined with single spaces, so original
/// whitespace (newlines, runs of spaces) is not preserved. The last chunk
/// may be shorter. Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    words
        .chunks(chunk_size.max(1))
        .map(|group| group.join(" "))
        .collect()
}
