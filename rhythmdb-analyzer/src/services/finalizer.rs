//! Instrument finalizer (C6): a pure function merging ensemble, rescue, and
//! additional label sources into the canonical `analysis.instruments` /
//! `analysis.final_instruments` list (spec.md §4.6).

use std::collections::HashSet;

const BRASS_MEMBERS: &[&str] = &[
    "Trumpet",
    "Trombone",
    "French Horn",
    "Tuba",
    "Flugelhorn",
    "Cornet",
    "Trumpet (mute)",
    "Trumpet (muted)",
];

const WOODWIND_MEMBERS: &[&str] = &[
    "Saxophone",
    "Alto Saxophone",
    "Tenor Saxophone",
    "Baritone Saxophone",
    "Flute",
    "Clarinet",
    "Oboe",
    "Bassoon",
    "Piccolo",
];

const STRING_MEMBERS: &[&str] = &["Violin", "Viola", "Cello", "Double Bass", "Harp"];

/// Pad-like instruments that, absent any bowed anchor, suggest a lone
/// "Strings" detection is actually a synth pad misdetection (§4.6 step 4).
const PAD_LIKE: &[&str] = &["Organ", "Keyboard", "Synth"];

/// `(variant, canonical)` alias table, applied before dedup.
const ALIASES: &[(&str, &str)] = &[
    ("Drum set", "Drum Kit (acoustic)"),
    ("Drums", "Drum Kit (acoustic)"),
    ("Electric organ", "Organ"),
    ("Hammond organ", "Organ"),
    ("Strings (section)", "Strings"),
    ("Brass (section)", "Brass"),
    ("Woodwinds (section)", "Woodwinds"),
    ("Woodwind", "Woodwinds"),
    ("Guitars", "Electric Guitar"),
];

fn normalize_alias(label: &str) -> String {
    for (variant, canonical) in ALIASES {
        if label.eq_ignore_ascii_case(variant) {
            return (*canonical).to_string();
        }
    }
    label.to_string()
}

/// Decide whether a family collapses, and strip its member tokens from
/// `list` in place.
///
/// `min_members` is the minimum count of *distinct member tokens* required
/// to trigger collapse; the family token already present in `list` is
/// always sufficient on its own (nothing to remove). Brass and woodwinds
/// collapse on a single member present (spec.md §4.6 literal rule); strings
/// requires at least two (spec.md §8 scenario 4: a lone bowed instrument is
/// left as itself) — see DESIGN.md for this resolved ambiguity.
///
/// Returns whether the family token is present in the result (explicitly,
/// or synthesized by this collapse).
fn collapse_family(list: &mut Vec<String>, members: &[&str], family_token: &str, min_members: usize) -> bool {
    let member_count = list.iter().filter(|x| members.contains(&x.as_str())).count();
    let family_already_present = list.iter().any(|x| x == family_token);

    if member_count == 0 {
        return family_already_present;
    }
    if member_count < min_members {
        return family_already_present;
    }

    list.retain(|x| !members.contains(&x.as_str()));
    true
}

/// Strings soft-guard (spec.md §4.6 step 4 / §8 soft-guard scenario):
/// remove a lone, unanchored "Strings" presence padded by synth-like
/// instruments with no bowed member and no brass anchor.
fn strings_anchored(list: &[String], strings_present: bool) -> bool {
    if !strings_present {
        return false;
    }
    let has_bowed_member = list
        .iter()
        .any(|x| matches!(x.as_str(), "Violin" | "Viola" | "Cello" | "Double Bass"));
    let has_pad = list.iter().any(|x| PAD_LIKE.contains(&x.as_str()));
    let has_brass_anchor = list.iter().any(|x| x == "Brass");

    !(!has_bowed_member && has_pad && !has_brass_anchor)
}

/// Merge the three ordered label sources into the canonical, deduplicated
/// instrument list. Pure, no I/O; idempotent per spec.md §8.
///
/// Assembly order: any synthesized/retained family tokens first, in the
/// fixed order `Brass, Woodwinds, Strings`, followed by the remaining
/// non-member, non-family-token entries in their original relative order.
pub fn finalize(ensemble: &[String], probe_rescues: &[String], additional: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for label in ensemble.iter().chain(probe_rescues).chain(additional) {
        let canon = normalize_alias(label);
        if seen.insert(canon.clone()) {
            ordered.push(canon);
        }
    }

    let brass_present = collapse_family(&mut ordered, BRASS_MEMBERS, "Brass", 1);
    let woodwinds_present = collapse_family(&mut ordered, WOODWIND_MEMBERS, "Woodwinds", 1);
    let strings_present = collapse_family(&mut ordered, STRING_MEMBERS, "Strings", 2);
    let strings_present = strings_anchored(&ordered, strings_present);

    // `ordered` at this point holds only non-member tokens (members were
    // stripped by collapse_family), possibly still containing the literal
    // family tokens themselves; strip those too so they aren't duplicated
    // by the fixed-order prefix below.
    ordered.retain(|x| x != "Brass" && x != "Woodwinds" && x != "Strings");

    let mut result = Vec::with_capacity(ordered.len() + 3);
    if brass_present {
        result.push("Brass".to_string());
    }
    if woodwinds_present {
        result.push("Woodwinds".to_string());
    }
    if strings_present {
        result.push("Strings".to_string());
    }
    result.extend(ordered);
    result
}
