//! Render and parse engines.
//!
//! Rendering turns a descriptor's current value into text in a
//! [`ContentBuffer`]; parsing turns written bytes back into a value and
//! hands it to the descriptor's setter.
//!
//! The two value shapes treat bad input differently: text with no leading
//! integer is coerced to zero and applied, while text that matches no
//! symbol is rejected without touching state. Both behaviors are kept as is.

use std::fmt::Write;

use tracing::{debug, error, info, warn};

use crate::buffer::{BufferState, ContentBuffer};
use crate::descriptor::{Accessor, Descriptor};
use crate::error::{VopsError, VopsResult};

/// Result of a render call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Content was built.
    Rendered,
    /// Buffer already had content; nothing was done.
    AlreadyPopulated,
}

/// Result of a parse call that reached the setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Integer decoded and applied.
    Applied(i64),
    /// No leading integer; zero was applied in its place.
    CoercedToZero,
    /// Symbol at this index was selected.
    Selected(usize),
}

/// Build the content of `descriptor` into `buffer`.
///
/// A buffer that already holds content is left alone, so calling this more
/// than once per open instance is safe.
pub fn render(buffer: &mut ContentBuffer, descriptor: &Descriptor) -> VopsResult<RenderOutcome> {
    match buffer.state() {
        BufferState::Released => {
            return Err(VopsError::BufferReleased(descriptor.name().to_string()));
        }
        BufferState::Populated => {
            debug!(file = descriptor.name(), "already has data, skipping");
            return Ok(RenderOutcome::AlreadyPopulated);
        }
        BufferState::Empty if !buffer.is_empty() => {
            debug!(file = descriptor.name(), "already has data, skipping");
            return Ok(RenderOutcome::AlreadyPopulated);
        }
        BufferState::Empty => {}
    }

    match descriptor.accessor() {
        Accessor::Numeric { get, .. } => {
            let value = get();
            debug!(file = descriptor.name(), value, "render numeric");
            writeln!(buffer, "{value}")?;
        }
        Accessor::Enumerated { get, symbols, .. } => {
            let current = get();
            if current >= symbols.len() {
                warn!(
                    file = descriptor.name(),
                    index = current,
                    "current index outside symbol table"
                );
            }
            write_menu(buffer, symbols, current)?;
        }
        Accessor::External(dispatcher) => {
            dispatcher.render(buffer)?;
        }
    }

    buffer.mark_populated();
    Ok(RenderOutcome::Rendered)
}

/// `a b [c] d\n` with the symbol at `current` bracketed.
fn write_menu(buffer: &mut ContentBuffer, symbols: &[&str], current: usize) -> std::fmt::Result {
    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            buffer.write_char(' ')?;
        }
        if i == current {
            write!(buffer, "[{symbol}]")?;
        } else {
            buffer.write_str(symbol)?;
        }
    }
    buffer.write_char('\n')
}

/// Decode `raw` and apply it through `descriptor`'s setter.
///
/// The setter is called at most once. Dispatcher files have no write
/// behavior here and are refused.
pub fn parse(raw: &[u8], descriptor: &Descriptor) -> VopsResult<ParseOutcome> {
    let name = descriptor.name();
    let payload = payload(raw);

    match descriptor.accessor() {
        Accessor::Numeric { set, .. } => {
            let (value, outcome) = match parse_int(payload) {
                Some(value) => (value, ParseOutcome::Applied(value)),
                None => {
                    warn!(
                        file = name,
                        raw = %String::from_utf8_lossy(payload),
                        "no leading integer, applying 0"
                    );
                    (0, ParseOutcome::CoercedToZero)
                }
            };
            set(value).inspect_err(|e| error!(file = name, value, "{e}"))?;
            info!(file = name, value, "set value");
            Ok(outcome)
        }
        Accessor::Enumerated { set, symbols, .. } => {
            let Some(index) = symbols.iter().position(|s| s.as_bytes() == payload) else {
                let e = VopsError::invalid_enum(name, payload);
                error!(file = name, "{e}");
                return Err(e);
            };
            set(index).inspect_err(|e| error!(file = name, index, "{e}"))?;
            info!(file = name, value = symbols[index], "set value");
            Ok(ParseOutcome::Selected(index))
        }
        Accessor::External(_) => Err(VopsError::NotWritable(name.to_string())),
    }
}

/// The bytes before the first `\n`, or all of `raw` if there is none.
pub fn payload(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == b'\n') {
        Some(end) => &raw[..end],
        None => raw,
    }
}

/// Best-effort decimal decode, C `atoi` style.
///
/// Skips leading ASCII whitespace, takes an optional sign and as many digits
/// as follow; anything after is ignored. Saturates at the `i64` bounds.
/// Returns `None` when no digit was found.
pub fn parse_int(text: &[u8]) -> Option<i64> {
    let mut rest = text;
    while let [first, tail @ ..] = rest {
        if !first.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let mut value: i64 = 0;
    for &b in &rest[..digits] {
        let d = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Dispatcher;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    const SYMBOLS: &[&str] = &["normal", "full", "handsup", "nocache", "quitting"];

    fn enum_descriptor(state: Arc<AtomicUsize>, sets: Arc<AtomicUsize>) -> Descriptor {
        let get_state = Arc::clone(&state);
        Descriptor::enumerated(
            "read_state",
            SYMBOLS,
            move || get_state.load(Ordering::SeqCst),
            move |i| {
                sets.fetch_add(1, Ordering::SeqCst);
                state.store(i, Ordering::SeqCst);
                Ok(())
            },
        )
    }

    fn int_descriptor(value: Arc<AtomicI64>) -> Descriptor {
        let get_value = Arc::clone(&value);
        Descriptor::numeric(
            "file_ttl",
            move || get_value.load(Ordering::SeqCst),
            move |v| {
                value.store(v, Ordering::SeqCst);
                Ok(())
            },
        )
    }

    fn rendered(descriptor: &Descriptor) -> String {
        let mut buf = ContentBuffer::new();
        render(&mut buf, descriptor).unwrap();
        String::from_utf8(buf.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_render_menu() {
        let d = enum_descriptor(Arc::new(AtomicUsize::new(0)), Arc::default());
        assert_eq!(rendered(&d), "[normal] full handsup nocache quitting\n");
    }

    #[test]
    fn test_render_menu_out_of_range() {
        let d = enum_descriptor(Arc::new(AtomicUsize::new(9)), Arc::default());
        assert_eq!(rendered(&d), "normal full handsup nocache quitting\n");
    }

    #[test]
    fn test_enum_roundtrip_every_symbol() {
        let state = Arc::new(AtomicUsize::new(0));
        let d = enum_descriptor(Arc::clone(&state), Arc::default());
        for (i, sym) in SYMBOLS.iter().enumerate() {
            let out = parse(format!("{sym}\n").as_bytes(), &d).unwrap();
            assert_eq!(out, ParseOutcome::Selected(i));
            let text = rendered(&d);
            assert_eq!(text.matches('[').count(), 1);
            assert!(text.contains(&format!("[{sym}]")));
        }
    }

    #[test]
    fn test_enum_rejects_unknown_symbol() {
        let state = Arc::new(AtomicUsize::new(2));
        let sets = Arc::new(AtomicUsize::new(0));
        let d = enum_descriptor(Arc::clone(&state), Arc::clone(&sets));

        let inputs: [&[u8]; 7] = [b"bogus\n", b"[full]", b" full", b"full ", b"Full", b"", b"\n"];
        for bad in inputs {
            let result = parse(bad, &d);
            assert!(matches!(result, Err(VopsError::InvalidEnumValue { .. })));
        }
        assert_eq!(sets.load(Ordering::SeqCst), 0);
        assert_eq!(state.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_enum_ignores_bytes_after_newline() {
        let state = Arc::new(AtomicUsize::new(0));
        let d = enum_descriptor(Arc::clone(&state), Arc::default());
        assert_eq!(parse(b"nocache\ngarbage", &d).unwrap(), ParseOutcome::Selected(3));
        assert_eq!(parse(b"full", &d).unwrap(), ParseOutcome::Selected(1));
    }

    #[test]
    fn test_numeric_roundtrip() {
        let value = Arc::new(AtomicI64::new(300));
        let d = int_descriptor(Arc::clone(&value));
        assert_eq!(rendered(&d), "300\n");

        for n in [0, 1, -1, 120, i64::MAX, i64::MIN] {
            assert_eq!(parse(format!("{n}\n").as_bytes(), &d).unwrap(), ParseOutcome::Applied(n));
            assert_eq!(rendered(&d), format!("{n}\n"));
        }
    }

    // Numeric and enumerated writes deliberately differ on malformed input:
    // numeric coerces to zero and applies, enumerated rejects.
    #[test]
    fn test_malformed_policy_is_asymmetric() {
        let value = Arc::new(AtomicI64::new(300));
        let numeric = int_descriptor(Arc::clone(&value));
        assert_eq!(parse(b"bogus\n", &numeric).unwrap(), ParseOutcome::CoercedToZero);
        assert_eq!(value.load(Ordering::SeqCst), 0);

        let state = Arc::new(AtomicUsize::new(1));
        let enumerated = enum_descriptor(Arc::clone(&state), Arc::default());
        assert!(parse(b"bogus\n", &enumerated).is_err());
        assert_eq!(state.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_setter_rejection_propagates() {
        let d = Descriptor::numeric("file_thread_interval", || 1, |v| {
            if (1..100).contains(&v) {
                Ok(())
            } else {
                Err(VopsError::rejected("file_thread_interval", "must be in 1..100"))
            }
        });
        assert!(parse(b"50\n", &d).is_ok());
        assert!(matches!(parse(b"500\n", &d), Err(VopsError::ValueRejected { .. })));
    }

    #[test]
    fn test_render_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let d = Descriptor::numeric(
            "file_ttl",
            move || {
                counted.fetch_add(1, Ordering::SeqCst);
                7
            },
            |_| Ok(()),
        );

        let mut buf = ContentBuffer::new();
        assert_eq!(render(&mut buf, &d).unwrap(), RenderOutcome::Rendered);
        let first = buf.as_bytes().to_vec();
        assert_eq!(render(&mut buf, &d).unwrap(), RenderOutcome::AlreadyPopulated);
        assert_eq!(buf.as_bytes(), &first[..]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_released_buffer() {
        let d = Descriptor::numeric("file_ttl", || 1, |_| Ok(()));
        let mut buf = ContentBuffer::new();
        buf.release();
        assert!(matches!(render(&mut buf, &d), Err(VopsError::BufferReleased(_))));
    }

    struct Silent;

    impl Dispatcher for Silent {
        fn render(&self, _buf: &mut ContentBuffer) -> VopsResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_external_render_and_write() {
        let d = Descriptor::external("quiet", Arc::new(Silent));
        let mut buf = ContentBuffer::new();
        assert_eq!(render(&mut buf, &d).unwrap(), RenderOutcome::Rendered);
        assert_eq!(buf.state(), BufferState::Populated);
        assert_eq!(buf.len(), 0);
        assert_eq!(render(&mut buf, &d).unwrap(), RenderOutcome::AlreadyPopulated);

        assert!(matches!(parse(b"x\n", &d), Err(VopsError::NotWritable(_))));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(b"42"), Some(42));
        assert_eq!(parse_int(b"  \t-17abc"), Some(-17));
        assert_eq!(parse_int(b"+8"), Some(8));
        assert_eq!(parse_int(b"12 34"), Some(12));
        assert_eq!(parse_int(b"99999999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_int(b"-99999999999999999999999"), Some(i64::MIN));
        assert_eq!(parse_int(b"abc"), None);
        assert_eq!(parse_int(b"-"), None);
        assert_eq!(parse_int(b""), None);
        assert_eq!(parse_int(b"- 5"), None);
    }

    #[test]
    fn test_payload() {
        assert_eq!(payload(b"apply\n"), b"apply");
        assert_eq!(payload(b"apply\nmore\n"), b"apply");
        assert_eq!(payload(b"apply"), b"apply");
        assert_eq!(payload(b"\n"), b"");
    }
}
