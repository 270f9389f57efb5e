//! Re-encode a clip under the byte budget.

use std::path::PathBuf;

use reframe_common::config::AppConfig;
use reframe_render_engine::{check_file_size, VideoEditor};

pub async fn run(config: AppConfig, source: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Compressing: {}", source.display());
    let before = check_file_size(&source, "The file size of the source file is: ");

    let editor = VideoEditor::new(config)?;
    let exported = editor.compress(source).await?;
    let path = super::deliver(exported, output)?;

    let after = check_file_size(&path, "The file size of the compressed file is: ");
    println!("  Size: {before:.2} MiB -> {after:.2} MiB");
    println!("Compression complete: {}", path.display());
    Ok(())
}
