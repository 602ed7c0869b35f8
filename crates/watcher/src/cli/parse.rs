use anyhow::Context;

/// Run the listing parser over a saved page and print what it found.
pub fn parse_file(path: &str) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let listing = bw_portal::parse_listing(&html);

    if listing.is_empty() {
        eprintln!("no posts found in {path}");
        return Ok(());
    }
    println!("{}", listing.summary());
    eprintln!("{} post(s)", listing.len());
    Ok(())
}
