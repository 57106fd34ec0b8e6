//! Terminal output for query results

use crate::index::{QueryResults, SearchResult};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Print every query with its ranked results
pub fn print_results(results: &QueryResults, color: bool) -> io::Result<()> {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    write_results(&mut stdout, results)
}

/// Render results into any color-capable writer.
///
/// One heading per query, then one line per result:
/// `<location>:<count>:<score>`.
pub fn write_results<W: WriteColor>(out: &mut W, results: &QueryResults) -> io::Result<()> {
    let mut first = true;
    for (query, matches) in results {
        if !first {
            // Blank line between queries
            writeln!(out)?;
        }
        first = false;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
        writeln!(out, "{}", query)?;
        out.reset()?;

        if matches.is_empty() {
            out.set_color(ColorSpec::new().set_dimmed(true))?;
            writeln!(out, "(no matches)")?;
            out.reset()?;
            continue;
        }

        for result in matches {
            write_result(out, result)?;
        }
    }
    Ok(())
}

fn write_result<W: WriteColor>(out: &mut W, result: &SearchResult) -> io::Result<()> {
    write!(out, "{}", result.location)?;
    write!(out, ":")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(out, "{}", result.count)?;
    out.reset()?;
    write!(out, ":")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    writeln!(out, "{:.8}", result.score)?;
    out.reset()?;
    Ok(())
}
