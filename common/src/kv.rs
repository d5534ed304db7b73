use serde::{Deserialize, Serialize};

/// Par clave/valor que emite Map y consume Reduce.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Map(nombre_documento, contenido) -> pares.
/// Se puede ejecutar más de una vez sobre la misma entrada.
pub type MapFn = fn(&str, &str) -> Vec<KeyValue>;

/// Reduce(clave, valores) -> valor agregado.
pub type ReduceFn = fn(&str, &[String]) -> String;

/* =========================
   Particionado por hash
   ========================= */

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a de 32 bits, sin el bit de signo.
///
/// Tiene que dar lo mismo en todos los procesos y compilaciones: un reducer
/// de otra máquina depende de que el mapper haya elegido la misma partición.
pub fn ihash(key: &str) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for b in key.as_bytes() {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h & 0x7fff_ffff
}

/// `None` si no hay particiones.
pub fn partition_for(key: &str, num_partitions: usize) -> Option<usize> {
    (ihash(key) as usize).checked_rem(num_partitions)
}

/// Reparte los pares en exactamente `num_partitions` buckets
/// según hash(key) % num_partitions. Los buckets vacíos también se devuelven;
/// con 0 particiones el resultado es vacío y los pares se descartan.
pub fn partition(pairs: Vec<KeyValue>, num_partitions: usize) -> Vec<Vec<KeyValue>> {
    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); num_partitions];
    for kv in pairs {
        if let Some(pid) = partition_for(&kv.key, num_partitions) {
            buckets[pid].push(kv);
        }
    }
    buckets
}

/// Ordena por clave (estable) y agrupa claves consecutivas iguales.
/// Devuelve los grupos en orden de clave, cada uno con todos sus valores.
pub fn group_by_key(mut pairs: Vec<KeyValue>) -> Vec<(String, Vec<String>)> {
    pairs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for kv in pairs {
        match groups.last_mut() {
            Some((key, values)) if *key == kv.key => values.push(kv.value),
            _ => groups.push((kv.key, vec![kv.value])),
        }
    }
    groups
}
