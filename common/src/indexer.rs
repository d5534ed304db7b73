use std::collections::BTreeSet;

use crate::kv::KeyValue;

/// Map del índice invertido: un par (palabra, documento) por cada palabra
/// distinta del documento. Una palabra es una secuencia de letras.
pub fn map(document: &str, contents: &str) -> Vec<KeyValue> {
    let words: BTreeSet<&str> = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    words
        .into_iter()
        .map(|w| KeyValue::new(w, document))
        .collect()
}

/// Reduce del índice invertido: "<n> <doc1>,<doc2>,..." con los documentos ordenados.
pub fn reduce(_key: &str, values: &[String]) -> String {
    let mut docs: Vec<&str> = values.iter().map(String::as_str).collect();
    docs.sort_unstable();
    format!("{} {}", docs.len(), docs.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_emite_cada_palabra_una_vez_por_documento() {
        let kvs = map("pg-1.txt", "the cat and the hat");
        let keys: Vec<&str> = kvs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["and", "cat", "hat", "the"]);
        assert!(kvs.iter().all(|kv| kv.value == "pg-1.txt"));
    }

    #[test]
    fn map_separa_en_no_letras() {
        let kvs = map("d", "foo42bar--baz");
        let keys: Vec<&str> = kvs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["bar", "baz", "foo"]);
    }

    #[test]
    fn reduce_lista_documentos_ordenados() {
        let values = vec!["b.txt".to_string(), "a.txt".to_string()];
        assert_eq!(reduce("word", &values), "2 a.txt,b.txt");
    }
}
