use crate::models::{RowMove, RowPosition, TrackerListUpdate};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One row of a visible-list snapshot: a stable identity plus a content
/// fingerprint so reordering and in-place edits stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SnapshotRow {
    pub id: Uuid,
    pub fingerprint: u64,
}

/// Section titles double as section identity; within one snapshot they are
/// unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SnapshotSection {
    pub title: String,
    pub rows: Vec<SnapshotRow>,
}

/// Compares two snapshots of the visible list and produces the minimal batch
/// of section and row changes between them.
///
/// Rows that merely shift because a neighbor was inserted or removed are not
/// reported; a move is only emitted when a row changes its relative order
/// against the other survivors of its section, or hops between two surviving
/// sections. Rows inside inserted or deleted sections ride along with the
/// section change. A row that both moves and changes content is reported as
/// a move only.
pub(crate) fn reconcile(old: &[SnapshotSection], new: &[SnapshotSection]) -> TrackerListUpdate {
    let mut update = TrackerListUpdate::default();

    let old_titles: HashMap<&str, usize> = old
        .iter()
        .enumerate()
        .map(|(index, section)| (section.title.as_str(), index))
        .collect();
    let new_titles: HashMap<&str, usize> = new
        .iter()
        .enumerate()
        .map(|(index, section)| (section.title.as_str(), index))
        .collect();

    for (index, section) in old.iter().enumerate() {
        if !new_titles.contains_key(section.title.as_str()) {
            update.deleted_sections.push(index);
        }
    }
    for (index, section) in new.iter().enumerate() {
        if !old_titles.contains_key(section.title.as_str()) {
            update.inserted_sections.push(index);
        }
    }

    let old_positions = position_map(old);
    let new_positions = position_map(new);

    // rows that vanished or appeared outright; rows of vanished or appeared
    // sections are covered by the section change itself
    for (section_index, section) in old.iter().enumerate() {
        let section_survives = new_titles.contains_key(section.title.as_str());
        for (row_index, row) in section.rows.iter().enumerate() {
            if new_positions.contains_key(&row.id) {
                continue;
            }
            if section_survives {
                update.deleted_rows.push(RowPosition {
                    section: section_index,
                    row: row_index,
                });
            }
        }
    }
    for (section_index, section) in new.iter().enumerate() {
        let section_existed = old_titles.contains_key(section.title.as_str());
        for (row_index, row) in section.rows.iter().enumerate() {
            if old_positions.contains_key(&row.id) {
                continue;
            }
            if section_existed {
                update.inserted_rows.push(RowPosition {
                    section: section_index,
                    row: row_index,
                });
            }
        }
    }

    // survivors that stayed in their section: keep the longest run whose
    // relative order is unchanged, report the rest as moves, and report
    // content changes on the stationary ones
    for (new_section_index, new_section) in new.iter().enumerate() {
        let old_section_index = match old_titles.get(new_section.title.as_str()) {
            Some(index) => *index,
            None => continue,
        };
        let old_section = &old[old_section_index];
        let old_rows: HashMap<Uuid, usize> = old_section
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.id, index))
            .collect();

        let mut survivors: Vec<(usize, usize)> = Vec::new(); // (new row, old row)
        for (new_row, row) in new_section.rows.iter().enumerate() {
            if let Some(&old_row) = old_rows.get(&row.id) {
                survivors.push((new_row, old_row));
            }
        }

        let old_order: Vec<usize> = survivors.iter().map(|&(_, old_row)| old_row).collect();
        let stable = stable_positions(&old_order);

        for (position, &(new_row, old_row)) in survivors.iter().enumerate() {
            if stable.contains(&position) {
                if old_section.rows[old_row].fingerprint != new_section.rows[new_row].fingerprint {
                    update.updated_rows.push(RowPosition {
                        section: old_section_index,
                        row: old_row,
                    });
                }
            } else {
                update.moved_rows.push(RowMove {
                    from: RowPosition {
                        section: old_section_index,
                        row: old_row,
                    },
                    to: RowPosition {
                        section: new_section_index,
                        row: new_row,
                    },
                });
            }
        }
    }

    // survivors that hopped between sections
    for (new_section_index, new_section) in new.iter().enumerate() {
        for (new_row, row) in new_section.rows.iter().enumerate() {
            let (old_section_index, old_row) = match old_positions.get(&row.id) {
                Some(position) => *position,
                None => continue,
            };
            if old[old_section_index].title == new_section.title {
                continue;
            }

            let source_survives = new_titles.contains_key(old[old_section_index].title.as_str());
            let target_existed = old_titles.contains_key(new_section.title.as_str());
            match (source_survives, target_existed) {
                (true, true) => update.moved_rows.push(RowMove {
                    from: RowPosition {
                        section: old_section_index,
                        row: old_row,
                    },
                    to: RowPosition {
                        section: new_section_index,
                        row: new_row,
                    },
                }),
                (true, false) => update.deleted_rows.push(RowPosition {
                    section: old_section_index,
                    row: old_row,
                }),
                (false, true) => update.inserted_rows.push(RowPosition {
                    section: new_section_index,
                    row: new_row,
                }),
                (false, false) => {}
            }
        }
    }

    update.inserted_sections.sort_unstable();
    update.deleted_sections.sort_unstable();
    update.inserted_rows.sort_unstable();
    update.deleted_rows.sort_unstable();
    update.updated_rows.sort_unstable();
    update.moved_rows.sort_unstable();

    update
}

fn position_map(snapshot: &[SnapshotSection]) -> HashMap<Uuid, (usize, usize)> {
    let mut positions = HashMap::new();
    for (section_index, section) in snapshot.iter().enumerate() {
        for (row_index, row) in section.rows.iter().enumerate() {
            positions.insert(row.id, (section_index, row_index));
        }
    }
    positions
}

/// Longest increasing subsequence over the survivors' old row indices,
/// returned as positions into the input slice. Everything on the run kept
/// its relative order; everything off it moved.
fn stable_positions(old_order: &[usize]) -> HashSet<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; old_order.len()];

    for (position, &value) in old_order.iter().enumerate() {
        let slot = tails.partition_point(|&tail| old_order[tail] < value);
        if slot > 0 {
            predecessor[position] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(position);
        } else {
            tails[slot] = position;
        }
    }

    let mut stable = HashSet::new();
    let mut cursor = tails.last().copied();
    while let Some(position) = cursor {
        stable.insert(position);
        cursor = predecessor[position];
    }
    stable
}
