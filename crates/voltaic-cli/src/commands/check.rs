use std::io::Write;
use std::path::Path;

pub fn run(layout: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let engine = super::load_engine(layout)?;

    writeln!(out, "  All checks passed for '{}'.", layout.display())?;
    writeln!(
        out,
        "  {} blocks, {} pending events",
        engine.block_count(),
        engine.delay_queue().len()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{write, CIRCUIT};
    use tempfile::TempDir;

    #[test]
    fn reports_block_count() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "circuit.json", CIRCUIT);
        let mut out = Vec::new();
        run(&path, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("3 blocks, 0 pending events"), "{text}");
    }

    #[test]
    fn invalid_state_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bad.json",
            r#"{ "blocks": [{ "type": "default:delayer", "position": [0, 0, 0],
                 "state": { "facing": "omni", "delay": 2 } }] }"#,
        );
        let err = run(&path, &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("block 0"), "{err:#}");
    }
}
