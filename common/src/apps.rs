use std::fmt;

use crate::kv::{MapFn, ReduceFn};
use crate::{indexer, wordcount};

/// Par Map/Reduce con nombre, elegible desde la línea de comandos del worker.
#[derive(Clone, Copy)]
pub struct Application {
    pub name: &'static str,
    pub map: MapFn,
    pub reduce: ReduceFn,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application").field("name", &self.name).finish()
    }
}

pub const WORDCOUNT: Application = Application {
    name: "wc",
    map: wordcount::map,
    reduce: wordcount::reduce,
};

pub const INDEXER: Application = Application {
    name: "indexer",
    map: indexer::map,
    reduce: indexer::reduce,
};

const ALL: [Application; 2] = [WORDCOUNT, INDEXER];

pub fn lookup(name: &str) -> Option<Application> {
    ALL.iter().copied().find(|app| app.name == name)
}

pub fn names() -> Vec<&'static str> {
    ALL.iter().map(|app| app.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_encuentra_apps_incluidas() {
        assert_eq!(lookup("wc").map(|a| a.name), Some("wc"));
        assert_eq!(lookup("indexer").map(|a| a.name), Some("indexer"));
        assert!(lookup("grep").is_none());
        assert_eq!(names(), vec!["wc", "indexer"]);
    }
}
