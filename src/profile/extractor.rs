/// Connective words that never identify a topic on their own.
const STOP_WORDS: &[&str] = &[
    "and", "or", "the", "with", "for", "from", "of", "in", "on", "at", "to", "a", "an", "about",
];

/// Keywords a topic name contributes to matching: lowercase tokens with
/// stop words and tokens of length <= 2 dropped. A name that collapses to
/// nothing here can never match and is effectively unlearnable until
/// renamed. Known limitation, left visible on purpose.
pub fn topic_keywords(topic: &str) -> Vec<String> {
    topic
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() > 2 && !STOP_WORDS.contains(word))
        .map(String::from)
        .collect()
}

/// Match profile topics against article text. A topic matches if any of its
/// keywords appears as a case-insensitive substring of title + content. The
/// vocabulary is whatever the live profile contains, so extraction adapts as
/// topics come and go; no model call is involved.
pub fn extract_topics(title: &str, content: &str, topics: &[String]) -> Vec<String> {
    let haystack = format!("{title} {content}").to_lowercase();

    topics
        .iter()
        .filter(|topic| {
            topic_keywords(topic)
                .iter()
                .any(|keyword| haystack.contains(keyword.as_str()))
        })
        .cloned()
        .collect()
}
