use crate::kv::KeyValue;

/// Limpia un token: sólo alfanumérico y '_', en minúscula.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Map de WordCount: un par (palabra, "1") por cada aparición.
pub fn map(_document: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split_whitespace()
        .map(normalize)
        .filter(|w| !w.is_empty())
        .map(|w| KeyValue::new(w, "1"))
        .collect()
}

/// Reduce de WordCount: cantidad de apariciones.
pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}
