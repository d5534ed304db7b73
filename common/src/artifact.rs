use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use crate::handle::WorkerHandle;
use crate::kv::KeyValue;
use crate::task::TaskId;

/* =========================
   Convención de nombres
   ========================= */

/// Intermedio: (handle del mapper, id de map, partición) -> `<handle>/mr-<map>-<part>`.
/// Final: id de reduce -> `<dir>/mr-out-<reduce>`.
///
/// No hay directorio compartido ni locks entre workers: un reducer encuentra
/// cada salida de map sólo a partir de estos nombres.
pub fn intermediate_name(map_id: TaskId, partition: usize) -> String {
    format!("mr-{}-{}", map_id, partition)
}

pub fn output_name(reduce_id: TaskId) -> String {
    format!("mr-out-{}", reduce_id)
}

pub fn intermediate_path(handle: &WorkerHandle, map_id: TaskId, partition: usize) -> PathBuf {
    handle.to_path_buf().join(intermediate_name(map_id, partition))
}

pub fn output_path(output_dir: &Path, reduce_id: TaskId) -> PathBuf {
    output_dir.join(output_name(reduce_id))
}

/* =========================
   Escritura atómica
   ========================= */

/// Escribe `contents` en un temporal del mismo directorio y lo renombra
/// sobre `path`. Un lector ve el archivo viejo completo o el nuevo completo,
/// nunca uno a medias; si dos workers publican lo mismo gana el último.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "ruta sin nombre de archivo"))?;
    let tmp_path = dir.join(format!(".{}.tmp-{}", file_name, uuid::Uuid::new_v4()));

    let written = (|| -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()
    })();

    let result = written.and_then(|_| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/* =========================
   Artefactos de entrada / intermedios / finales
   ========================= */

pub fn read_input(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Guarda un bucket de map como JSONL (un `KeyValue` por línea).
pub fn write_intermediate(
    handle: &WorkerHandle,
    map_id: TaskId,
    partition: usize,
    pairs: &[KeyValue],
) -> io::Result<PathBuf> {
    let mut buf: Vec<u8> = Vec::new();
    for kv in pairs {
        serde_json::to_writer(&mut buf, kv)?;
        buf.push(b'\n');
    }

    let path = intermediate_path(handle, map_id, partition);
    write_atomic(&path, &buf)?;
    Ok(path)
}

pub fn read_intermediate(
    handle: &WorkerHandle,
    map_id: TaskId,
    partition: usize,
) -> io::Result<Vec<KeyValue>> {
    let path = intermediate_path(handle, map_id, partition);
    let reader = BufReader::new(File::open(&path)?);

    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let kv: KeyValue = serde_json::from_str(&line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("línea inválida en {}: {e}", path.display()),
            )
        })?;
        out.push(kv);
    }
    Ok(out)
}

/// Publica la salida de un reduce: líneas "clave valor" en el orden recibido.
pub fn publish_output(
    output_dir: &Path,
    reduce_id: TaskId,
    rows: &[(String, String)],
) -> io::Result<PathBuf> {
    let mut buf: Vec<u8> = Vec::new();
    for (key, value) in rows {
        writeln!(buf, "{} {}", key, value)?;
    }

    let path = output_path(output_dir, reduce_id);
    write_atomic(&path, &buf)?;
    Ok(path)
}
