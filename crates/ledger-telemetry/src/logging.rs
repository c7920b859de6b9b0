//! Event macros for ledger objects.
//!
//! Block events carry `height` and `block`, transaction events carry `txid`,
//! and both carry `subsystem`. JSON lines from different subsystems can then
//! be joined on the same field names.

/// Emit an event about a block.
#[macro_export]
macro_rules! block_event {
    ($level:ident, $subsystem:expr, $height:expr, $hash:expr, $msg:literal $(, $($field:tt)+)?) => {
        $crate::tracing::$level!(
            subsystem = $subsystem,
            height = $height,
            block = %$hash,
            $($($field)+,)?
            $msg
        )
    };
}

/// Emit an event about a transaction.
#[macro_export]
macro_rules! tx_event {
    ($level:ident, $subsystem:expr, $txid:expr, $msg:literal $(, $($field:tt)+)?) => {
        $crate::tracing::$level!(
            subsystem = $subsystem,
            txid = %$txid,
            $($($field)+,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut out) = self.0.lock() {
                out.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(emit: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_block_event_fields() {
        let line = captured(|| {
            crate::block_event!(info, "broadcast", 7u64, "ab12cd34", "announcing block", transactions = 3usize)
        });
        assert!(line.contains("announcing block"));
        assert!(line.contains("broadcast"));
        assert!(line.contains("height=7"));
        assert!(line.contains("block=ab12cd34"));
        assert!(line.contains("transactions=3"));
    }

    #[test]
    fn test_tx_event_fields() {
        let line = captured(|| crate::tx_event!(debug, "broadcast", "ffee0011", "announcing transaction"));
        assert!(line.contains("txid=ffee0011"));
        assert!(line.contains("announcing transaction"));
    }
}
