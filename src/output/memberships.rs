use std::fmt::Write;

use comfy_table::Cell;

use crate::membership::UserMemberships;

use super::styling::{dim, heading};
use super::tables::{create_table, cyan_header};

pub fn print_memberships(memberships: &UserMemberships) {
    println!("{}", render_memberships(memberships));
}

pub fn render_memberships(memberships: &UserMemberships) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} {}",
        heading("👤"),
        heading(format!(
            "{} ({})",
            memberships.display_name.as_deref().unwrap_or(&memberships.email),
            memberships.email
        ))
        .underlined()
    );
    let _ = writeln!(output, "  {}\n", dim(&memberships.descriptor));

    if memberships.groups.is_empty() {
        let _ = writeln!(output, "{}", dim("No memberships found for this user."));
        return output;
    }

    let mut table = create_table();
    table.set_header(cyan_header(&["Group / Team", "Display Name", "Description"]));
    for group in &memberships.groups {
        table.add_row(vec![
            Cell::new(group.principal_name.as_deref().unwrap_or(&group.descriptor)),
            Cell::new(group.display_name.as_deref().unwrap_or("-")),
            Cell::new(group.description.as_deref().unwrap_or("")),
        ]);
    }

    let _ = writeln!(output, "{table}");
    let _ = writeln!(
        output,
        "\nUser is a member of {} group(s)/team(s).",
        memberships.groups.len()
    );

    output
}
