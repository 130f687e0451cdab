//! # Localization
//!
//! Bilingual (`es`/`en`) message lookup, modeled as `translate(locale, key,
//! params)` per spec.md §9: "template functions returning formatted
//! strings ... are a lookup + interpolation". Falls back to `es` if a key
//! is missing for the requested locale, then to the bare key if it is
//! missing everywhere — so a typo in a call site degrades visibly instead
//! of panicking.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Fixed line every user-visible message (other than raw URLs) ends with.
pub const DISCLAIMER_ES: &str =
    "\n\n⚠️ Esta es una herramienta comunitaria sin garantías. Verifica antes de confiar.";
pub const DISCLAIMER_EN: &str =
    "\n\n⚠️ This is a community tool with no guarantees. Verify before relying on it.";

/// Appended to every note body before submission to the Notes API.
pub const ATTRIBUTION_FOOTER_ES: &str =
    "\n\n---\nCreado mediante OSM Mesh Notes Gateway (LoRa mesh → OSM Notes)";
pub const ATTRIBUTION_FOOTER_EN: &str =
    "\n\n---\nCreated via OSM Mesh Notes Gateway (LoRa mesh → OSM Notes)";

pub fn disclaimer(locale: &str) -> &'static str {
    if locale == "en" {
        DISCLAIMER_EN
    } else {
        DISCLAIMER_ES
    }
}

pub fn attribution_footer(locale: &str) -> &'static str {
    if locale == "en" {
        ATTRIBUTION_FOOTER_EN
    } else {
        ATTRIBUTION_FOOTER_ES
    }
}

type Templates = HashMap<&'static str, &'static str>;

static ES: Lazy<Templates> = Lazy::new(|| {
    let mut m = Templates::new();
    m.insert("command.help", "Comandos: #osmnote <texto>, #osmstatus, #osmcount, #osmlist [n], #osmqueue, #osmnodes, #osmlang [es|en], #osmmorehelp");
    m.insert("command.morehelp", "#osmnote <texto>: crea una nota con tu última posición GPS.\n#osmlist [n]: últimas n notas (1-20, por defecto 5).\n#osmlang es|en: cambia tu idioma.\nLas notas requieren una posición GPS reciente (<=120s).");
    m.insert("command.status.header", "Estado del gateway:");
    m.insert("command.status.internet_ok", "Internet: conectado");
    m.insert("command.status.internet_down", "Internet: sin conexión");
    m.insert("command.status.queue", "Cola pendiente: {count}");
    m.insert("command.count", "Notas totales: {total} | Hoy: {today} | En cola: {queue}");
    m.insert("command.list.header", "Tus últimas notas:");
    m.insert("command.list.empty", "Aún no tienes notas registradas.");
    m.insert("command.list.item", "{queue_id} [{status}] {text}");
    m.insert("command.queue", "Notas pendientes en el sistema: {count}");
    m.insert("command.nodes.header", "Nodos vistos recientemente:");
    m.insert("command.nodes.empty", "Aún no se ha visto ningún nodo.");
    m.insert("command.nodes.item", "{node} ({lat}, {lon}) hace {age}s, visto {seen} veces");
    m.insert("command.lang.set", "Idioma cambiado a español.");
    m.insert("command.lang.invalid", "Idioma no soportado. Usa: es | en");
    m.insert("note.queued", "Nota recibida y en cola: {queue_id}");
    m.insert("note.reject.empty_body", "El cuerpo de la nota no puede estar vacío.");
    m.insert("note.reject.oversized_body", "El texto es demasiado largo (máximo 200 caracteres).");
    m.insert("note.reject.no_gps_wait", "Esperando señal GPS, intenta de nuevo en {seconds}s más.");
    m.insert("note.reject.no_gps", "No se ha recibido una posición GPS reciente.");
    m.insert("note.reject.stale_gps", "La posición GPS es demasiado antigua (>2 min).");
    m.insert("note.reject.invalid_coords", "Coordenadas GPS inválidas.");
    m.insert("note.reject.rate_limit", "Has alcanzado el límite de notas por minuto. Intenta de nuevo más tarde.");
    m.insert("note.duplicate", "Ya registramos una nota igual recientemente.");
    m.insert("note.sent", "Nota {queue_id} enviada a OSM: {osm_url}{place}");
    m.insert("note.sent.place", " (cerca de {place})");
    m.insert("note.failed", "La nota {queue_id} no pudo enviarse después de {attempts} intentos.");
    m.insert("broadcast.daily", "Resumen diario: {count} notas enviadas a OpenStreetMap.");
    m.insert("notify.summary", "{count} notas fueron enviadas a OpenStreetMap.");
    m
});

static EN: Lazy<Templates> = Lazy::new(|| {
    let mut m = Templates::new();
    m.insert("command.help", "Commands: #osmnote <text>, #osmstatus, #osmcount, #osmlist [n], #osmqueue, #osmnodes, #osmlang [es|en], #osmmorehelp");
    m.insert("command.morehelp", "#osmnote <text>: creates a note at your last GPS fix.\n#osmlist [n]: last n notes (1-20, default 5).\n#osmlang es|en: changes your language.\nNotes require a recent GPS fix (<=120s).");
    m.insert("command.status.header", "Gateway status:");
    m.insert("command.status.internet_ok", "Internet: connected");
    m.insert("command.status.internet_down", "Internet: unreachable");
    m.insert("command.status.queue", "Pending queue: {count}");
    m.insert("command.count", "Total notes: {total} | Today: {today} | Queued: {queue}");
    m.insert("command.list.header", "Your latest notes:");
    m.insert("command.list.empty", "You have no notes yet.");
    m.insert("command.list.item", "{queue_id} [{status}] {text}");
    m.insert("command.queue", "System-wide pending notes: {count}");
    m.insert("command.nodes.header", "Recently seen nodes:");
    m.insert("command.nodes.empty", "No nodes have been seen yet.");
    m.insert("command.nodes.item", "{node} ({lat}, {lon}) {age}s ago, seen {seen} times");
    m.insert("command.lang.set", "Language switched to English.");
    m.insert("command.lang.invalid", "Unsupported language. Use: es | en");
    m.insert("note.queued", "Note received and queued: {queue_id}");
    m.insert("note.reject.empty_body", "The note body cannot be empty.");
    m.insert("note.reject.oversized_body", "The text is too long (200 characters max).");
    m.insert("note.reject.no_gps_wait", "Waiting for a GPS fix, try again in {seconds}s.");
    m.insert("note.reject.no_gps", "No recent GPS fix has been received.");
    m.insert("note.reject.stale_gps", "The GPS fix is too old (>2 min).");
    m.insert("note.reject.invalid_coords", "Invalid GPS coordinates.");
    m.insert("note.reject.rate_limit", "You've hit the per-minute note limit. Try again later.");
    m.insert("note.duplicate", "An identical note was already recorded recently.");
    m.insert("note.sent", "Note {queue_id} submitted to OSM: {osm_url}{place}");
    m.insert("note.sent.place", " (near {place})");
    m.insert("note.failed", "Note {queue_id} could not be submitted after {attempts} attempts.");
    m.insert("broadcast.daily", "Daily summary: {count} notes submitted to OpenStreetMap.");
    m.insert("notify.summary", "{count} notes were sent to OpenStreetMap.");
    m
});

fn table(locale: &str) -> &'static Templates {
    if locale == "en" {
        &EN
    } else {
        &ES
    }
}

/// Looks up `key` in `locale`'s table, falling back to `es` then to the
/// literal key, substituting each `{name}` placeholder from `params`.
pub fn translate(locale: &str, key: &str, params: &[(&str, &str)]) -> String {
    let template = table(locale)
        .get(key)
        .or_else(|| ES.get(key))
        .copied()
        .unwrap_or(key);
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_placeholders() {
        let s = translate("es", "note.queued", &[("queue_id", "Q-0001")]);
        assert_eq!(s, "Nota recibida y en cola: Q-0001");
    }

    #[test]
    fn falls_back_to_es_then_key_on_miss() {
        assert_eq!(translate("en", "note.queued", &[("queue_id", "Q-1")]), "Note received and queued: Q-1");
        assert_eq!(translate("fr", "no.such.key", &[]), "no.such.key");
    }

    #[test]
    fn disclaimer_and_footer_differ_by_locale() {
        assert_ne!(disclaimer("es"), disclaimer("en"));
        assert_ne!(attribution_footer("es"), attribution_footer("en"));
    }
}
