/// Discards everything. Useful for timing runs and as the convert-mode
/// stand-in where no audio is produced.
pub struct Null;

impl super::Sink for Null {
    fn write(&mut self, _pcm: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}
