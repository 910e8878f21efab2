//! Elements command implementation

use anyhow::Result;
use glyphrun::unicode::TextElements;
use serde::Serialize;

use crate::cli::ElementsArgs;

#[derive(Serialize)]
struct ElementsReport<'a> {
    text: &'a str,
    length: usize,
    count: usize,
    starts: &'a [usize],
}

pub fn run(args: &ElementsArgs) -> Result<()> {
    let elements = TextElements::new(&args.text);
    if args.json {
        let report = ElementsReport {
            text: &args.text,
            length: elements.len_utf16(),
            count: elements.count(),
            starts: elements.start_offsets(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} element(s) in {} code unit(s)",
        elements.count(),
        elements.len_utf16()
    );
    for (index, start) in elements.start_offsets().iter().enumerate() {
        let end = elements
            .element_range(index)
            .map_or(*start, |range| range.end);
        println!("{index:>4}  [{start}, {end})");
    }
    Ok(())
}
