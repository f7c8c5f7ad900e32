use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use kksavecodec::SaveFile;
use log::info;

/// Split a Koikatu save file into its embedded character cards.
///
/// Writes each card's thumbnail and attribute blobs to the output directory, then
/// re-serializes the save next to the input to confirm the round trip.
#[derive(Debug, Parser)]
#[command(name = "kksave", version, about)]
struct Args {
    /// Path to the save file.
    save_data: PathBuf,

    /// Directory the per-card files are written to.
    #[arg(long, default_value = "cards")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bytes = fs::read(&args.save_data)
        .with_context(|| format!("reading {}", args.save_data.display()))?;
    let save = SaveFile::from_bytes(&bytes)
        .with_context(|| format!("parsing {}", args.save_data.display()))?;

    println!("school: {}", save.school_name());

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    for (i, card) in save.cards().iter().enumerate() {
        write_atomic(&args.out_dir.join(format!("char_{i:03}.png")), card.thumbnail())?;
        write_atomic(
            &args.out_dir.join(format!("char_{i:03}.char.dat")),
            card.primary_data(),
        )?;
        write_atomic(
            &args.out_dir.join(format!("char_{i:03}.additional.dat")),
            card.additional_data(),
        )?;
    }
    info!(
        "exported {} cards to {}",
        save.card_count(),
        args.out_dir.display()
    );

    // confirm serializing
    let reencoded = save.to_bytes();
    if reencoded != bytes {
        bail!(
            "re-serializing {} did not reproduce the input bytes",
            args.save_data.display()
        );
    }

    let mut copy_name = args.save_data.clone().into_os_string();
    copy_name.push("_01.dat");
    write_atomic(Path::new(&copy_name), &reencoded)?;

    Ok(())
}

/// Writes via a temp file in the target directory and a rename, so a failure partway
/// through never leaves a truncated file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
    Ok(())
}
