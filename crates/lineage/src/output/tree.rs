//! Ancestor tree rendering for `lineage tree` output.

use std::io::{self, Write};

use colored::Colorize;

use super::{OutputConfig, dimmed};
use crate::display::{DisplayNode, NodeAttributes};
use crate::domain::Sex;

/// Birth and death years as `b. 1815 - d. 1852`.
///
/// Missing years are left out; returns an empty string when neither is
/// known.
pub fn life_span(attributes: &NodeAttributes) -> String {
    match (attributes.birth_year, attributes.death_year) {
        (Some(birth), Some(death)) => format!("b. {} - d. {}", birth, death),
        (Some(birth), None) => format!("b. {}", birth),
        (None, Some(death)) => format!("d. {}", death),
        (None, None) => String::new(),
    }
}

/// Render the ancestor tree with ASCII art connectors.
///
/// The root is printed first and each person's parents are nested below
/// them:
///
/// ```text
/// ◆ Ada Byron (F) b. 1815 - d. 1852 [7]
/// ├── George Byron (M) b. 1788 [3]
/// │   └── John Byron (M) b. 1756 [5] …
/// └── Anne Milbanke (F) b. 1792 [4]
/// ```
///
/// `…` marks a person whose parents lie beyond the depth limit.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn print_tree_text<W: Write>(
    w: &mut W,
    root: &DisplayNode,
    config: &OutputConfig,
) -> io::Result<()> {
    let root_icon = if config.use_ascii { "*" } else { "◆" };
    let root_icon_str = if config.use_colors {
        root_icon.cyan().bold().to_string()
    } else {
        root_icon.to_string()
    };

    writeln!(w, "{} {}", root_icon_str, format_person(root, config))?;

    print_tree_children(w, &root.children, &[], config)
}

/// Recursively render parents with proper connector lines.
///
/// `prefix_segments` tracks which levels still have siblings below, used to
/// draw the vertical continuation lines (`│`).
fn print_tree_children<W: Write>(
    w: &mut W,
    children: &[DisplayNode],
    prefix_segments: &[bool],
    config: &OutputConfig,
) -> io::Result<()> {
    let (branch, corner, pipe, space) = if config.use_ascii {
        ("|-- ", "`-- ", "|   ", "    ")
    } else {
        ("├── ", "└── ", "│   ", "    ")
    };

    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;

        let mut prefix = String::new();
        for &has_more in prefix_segments {
            prefix.push_str(&dimmed(if has_more { pipe } else { space }, config));
        }
        let connector = dimmed(if is_last { corner } else { branch }, config);

        writeln!(w, "{}{}{}", prefix, connector, format_person(child, config))?;

        if !child.children.is_empty() {
            let mut next_segments = prefix_segments.to_vec();
            next_segments.push(!is_last);
            print_tree_children(w, &child.children, &next_segments, config)?;
        }
    }

    Ok(())
}

fn format_person(node: &DisplayNode, config: &OutputConfig) -> String {
    let attributes = &node.attributes;

    let name = if config.use_colors {
        node.name.bold().to_string()
    } else {
        node.name.clone()
    };

    let sex = match attributes.sex {
        Sex::Unknown => String::new(),
        sex => format!(" ({})", colorize_sex(sex, config)),
    };

    let span = life_span(attributes);
    let span = if span.is_empty() {
        span
    } else {
        format!(" {}", span)
    };

    let id = format!("[{}]", attributes.person_id);
    let id = if config.use_colors {
        id.cyan().to_string()
    } else {
        id
    };

    let more = if attributes.has_more_ancestors {
        format!(" {}", dimmed(if config.use_ascii { "..." } else { "…" }, config))
    } else {
        String::new()
    };

    format!("{}{}{} {}{}", name, sex, span, id, more)
}

fn colorize_sex(sex: Sex, config: &OutputConfig) -> String {
    let code = sex.code();
    if !config.use_colors {
        return code.to_string();
    }
    match sex {
        Sex::Male => code.blue().to_string(),
        Sex::Female => code.magenta().to_string(),
        Sex::Unknown => code.to_string(),
    }
}
