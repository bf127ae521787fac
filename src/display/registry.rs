//! User and group display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{Group, Store, User};

#[derive(Tabled)]
struct UserRow<'a> {
    #[tabled(rename = "Name")]
    name: &'a str,
    #[tabled(rename = "ID")]
    id: &'a str,
}

#[derive(Tabled)]
struct GroupRow<'a> {
    #[tabled(rename = "Name")]
    name: &'a str,
    #[tabled(rename = "ID")]
    id: &'a str,
    #[tabled(rename = "Members")]
    members: usize,
}

/// Format registered users as a table
pub fn format_user_list(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.".to_string();
    }

    let rows = users.iter().map(|u| UserRow {
        name: &u.name,
        id: u.id.as_str(),
    });
    Table::new(rows).with(Style::sharp()).to_string()
}

/// Format groups as a table
pub fn format_group_list(groups: &[Group]) -> String {
    if groups.is_empty() {
        return "No groups found.".to_string();
    }

    let rows = groups.iter().map(|g| GroupRow {
        name: &g.name,
        id: g.id.as_str(),
        members: g.member_ids.len(),
    });
    Table::new(rows).with(Style::sharp()).to_string()
}

/// Format a single group with its members
pub fn format_group_details(store: &Store, group: &Group) -> String {
    let mut output = String::new();

    output.push_str(&format!("Group: {}\n", group.name));
    output.push_str(&format!("  ID:       {}\n", group.id));
    output.push_str(&format!("  Members:  {}\n", group.member_ids.len()));
    for member_id in &group.member_ids {
        output.push_str(&format!("    - {} ({})\n", store.display_name(member_id), member_id));
    }

    let transactions = store
        .transactions
        .iter()
        .filter(|t| t.group_id == group.id)
        .count();
    let payments = store.payments.iter().filter(|p| p.group_id == group.id).count();
    output.push_str(&format!("  Bills:    {}\n", transactions));
    output.push_str(&format!("  Payments: {}\n", payments));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::{create_group, upsert_user};
    use chrono::Utc;

    #[test]
    fn test_empty_lists() {
        assert_eq!(format_user_list(&[]), "No users found.");
        assert_eq!(format_group_list(&[]), "No groups found.");
    }

    #[test]
    fn test_user_table() {
        let user = User::new("Amir");
        let table = format_user_list(std::slice::from_ref(&user));
        assert!(table.contains("Name"));
        assert!(table.contains("Amir"));
        assert!(table.contains(user.id.as_str()));
    }

    #[test]
    fn test_group_details_lists_members_by_name() {
        let mut store = Store::default();
        let (amir, _) = upsert_user(&mut store, "Amir").unwrap();
        let group_id = create_group(&mut store, "RT_DEV", &[amir], Utc::now()).unwrap();
        let group = store.group(&group_id).unwrap();

        let details = format_group_details(&store, group);
        assert!(details.starts_with("Group: RT_DEV"));
        assert!(details.contains("- Amir ("));
        assert!(details.contains("Bills:    0"));
    }
}
