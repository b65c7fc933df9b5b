//! 요소 집합 diff와 변경 영역 병합.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deskstate_core::models::element::UiElement;
use deskstate_core::models::state::{ChangedRegion, VisualDiff};

/// 같은 ID의 두 요소가 의미 있게 달라졌는지
///
/// 위치/크기가 허용 오차를 넘게 움직였거나, 레이블/텍스트가 바뀌었거나,
/// 활성/표시/포커스 상태가 바뀌면 수정으로 본다.
pub fn element_changed(old: &UiElement, new: &UiElement, tolerance: u32) -> bool {
    let (a, b) = (&old.bounds, &new.bounds);
    let moved = a.x.abs_diff(b.x) > tolerance
        || a.y.abs_diff(b.y) > tolerance
        || a.width.abs_diff(b.width) > tolerance
        || a.height.abs_diff(b.height) > tolerance;

    moved
        || old.label != new.label
        || old.text != new.text
        || old.is_enabled != new.is_enabled
        || old.is_visible != new.is_visible
        || old.is_focused != new.is_focused
}

/// 이전/새 요소 집합의 ID 기반 diff
///
/// 추가는 새 목록 순서, 제거는 이전 목록 순서, 수정은 새 목록 순서로 모은다.
/// 새 목록에 같은 ID가 여러 번 나오면 마지막 항목이 이긴다.
pub fn compute_diff<'a>(
    old: impl IntoIterator<Item = &'a UiElement>,
    new: &[UiElement],
    tolerance: u32,
    timestamp: DateTime<Utc>,
) -> VisualDiff {
    let old: Vec<&UiElement> = old.into_iter().collect();
    let old_by_id: HashMap<&str, &UiElement> = old.iter().map(|e| (e.id.as_str(), *e)).collect();

    let mut new_by_id: HashMap<&str, &UiElement> = HashMap::with_capacity(new.len());
    let mut new_order: Vec<&str> = Vec::with_capacity(new.len());
    for element in new {
        if new_by_id.insert(element.id.as_str(), element).is_none() {
            new_order.push(element.id.as_str());
        }
    }

    let mut regions = Vec::new();
    let (mut added, mut removed, mut modified) = (0, 0, 0);

    for id in &new_order {
        if !old_by_id.contains_key(id) {
            regions.push(ChangedRegion::added(new_by_id[id].clone()));
            added += 1;
        }
    }

    for element in &old {
        if !new_by_id.contains_key(element.id.as_str()) {
            regions.push(ChangedRegion::removed((*element).clone()));
            removed += 1;
        }
    }

    for id in &new_order {
        if let Some(previous) = old_by_id.get(id) {
            let current = new_by_id[id];
            if element_changed(previous, current, tolerance) {
                regions.push(ChangedRegion::modified(previous.bounds, current.clone()));
                modified += 1;
            }
        }
    }

    VisualDiff {
        timestamp,
        changed_regions: merge_changed_regions(regions),
        total_added: added,
        total_removed: removed,
        total_modified: modified,
    }
}

/// 교차하는 변경 영역 병합
///
/// 좌상단 (y, x) 순으로 정렬한 뒤 훑으면서 이미 모은 영역과 교차하면 흡수한다.
/// 병합으로 커진 영역이 다른 영역과 새로 닿을 수 있으므로 변화가 없을 때까지 반복한다.
/// 결과 영역끼리는 서로 교차하지 않는다.
pub fn merge_changed_regions(mut regions: Vec<ChangedRegion>) -> Vec<ChangedRegion> {
    loop {
        let (merged, changed) = merge_pass(regions);
        if !changed {
            return merged;
        }
        regions = merged;
    }
}

fn merge_pass(mut regions: Vec<ChangedRegion>) -> (Vec<ChangedRegion>, bool) {
    if regions.len() <= 1 {
        return (regions, false);
    }

    regions.sort_by_key(|r| (r.bounds.y, r.bounds.x));

    let mut merged: Vec<ChangedRegion> = Vec::with_capacity(regions.len());
    let mut changed = false;
    for region in regions {
        match merged
            .iter()
            .position(|m| m.bounds.intersects(&region.bounds))
        {
            Some(i) => {
                merged[i].absorb(region);
                changed = true;
            }
            None => merged.push(region),
        }
    }
    (merged, changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskstate_core::models::element::ElementKind;
    use deskstate_core::models::geometry::Rect;
    use deskstate_core::models::state::ChangeKind;
    use std::collections::HashSet;

    fn el(kind: ElementKind, x: i32, y: i32, w: u32, h: u32) -> UiElement {
        UiElement::new(kind, Rect::new(x, y, w, h))
    }

    #[test]
    fn small_jitter_is_not_a_change() {
        let old = el(ElementKind::Button, 10, 10, 50, 20);
        let mut new = old.clone();
        new.bounds = Rect::new(14, 6, 52, 20);
        assert!(!element_changed(&old, &new, 5));
        new.bounds.x = 16;
        assert!(element_changed(&old, &new, 5));
    }

    #[test]
    fn label_text_and_flags_are_changes() {
        let old = el(ElementKind::Input, 0, 0, 100, 20).with_label("Name");
        assert!(element_changed(&old, &old.clone().with_label("Email"), 5));
        assert!(element_changed(&old, &old.clone().with_text("abc"), 5));
        assert!(element_changed(&old, &old.clone().with_flags(true, true, true), 5));
        assert!(!element_changed(&old, &old.clone(), 5));
    }

    #[test]
    fn moved_button_is_single_modified_region() {
        let ok = el(ElementKind::Button, 10, 10, 50, 20).with_label("OK");
        let mut moved = ok.clone();
        moved.bounds = Rect::new(10, 40, 50, 20);

        let diff = compute_diff([&ok], &[moved], 5, Utc::now());
        assert_eq!(
            (diff.total_added, diff.total_removed, diff.total_modified),
            (0, 0, 1)
        );
        assert_eq!(diff.changed_regions.len(), 1);
        assert_eq!(diff.changed_regions[0].bounds, Rect::new(10, 10, 50, 50));
        assert_eq!(diff.changed_regions[0].change_kind, ChangeKind::Modified);
    }

    #[test]
    fn added_and_removed_far_apart_stay_separate() {
        let old = el(ElementKind::Text, 0, 0, 10, 10);
        let new = el(ElementKind::Text, 500, 500, 10, 10);
        let diff = compute_diff([&old], &[new], 5, Utc::now());
        assert_eq!((diff.total_added, diff.total_removed), (1, 1));
        assert_eq!(diff.changed_regions.len(), 2);
        assert_eq!(diff.changed_regions[0].change_kind, ChangeKind::Removed);
        assert_eq!(diff.changed_regions[1].change_kind, ChangeKind::Added);
    }

    #[test]
    fn identical_sets_have_no_changes() {
        let a = el(ElementKind::Icon, 0, 0, 16, 16);
        let b = el(ElementKind::Icon, 40, 0, 16, 16);
        let diff = compute_diff([&a, &b], &[a.clone(), b.clone()], 5, Utc::now());
        assert!(!diff.has_changes());
    }

    #[test]
    fn duplicate_new_ids_last_wins() {
        let old = el(ElementKind::Text, 0, 0, 10, 10).with_text("a");
        let first = old.clone().with_text("a");
        let last = old.clone().with_text("b");
        let diff = compute_diff([&old], &[first, last], 5, Utc::now());
        assert_eq!(diff.total_modified, 1);
        assert_eq!(
            diff.modified_elements().next().unwrap().text.as_deref(),
            Some("b")
        );
    }

    #[test]
    fn merge_overlapping_regions() {
        let a = ChangedRegion::added(el(ElementKind::Button, 0, 0, 20, 20));
        let b = ChangedRegion::removed(el(ElementKind::Button, 10, 10, 20, 20));
        let c = ChangedRegion::added(el(ElementKind::Button, 300, 300, 5, 5));
        let merged = merge_changed_regions(vec![c, b, a]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].bounds, Rect::new(0, 0, 30, 30));
        assert_eq!(merged[0].change_kind, ChangeKind::Modified);
        assert_eq!(merged[0].element_count(), 2);
        assert_eq!(merged[1].change_kind, ChangeKind::Added);
    }

    #[test]
    fn merge_cascades_through_grown_region() {
        // a와 c는 직접 닿지 않지만 a∪b가 c와 닿는다
        let a = ChangedRegion::added(el(ElementKind::Text, 0, 0, 10, 10));
        let c = ChangedRegion::added(el(ElementKind::Text, 40, 5, 10, 10));
        let b = ChangedRegion::added(el(ElementKind::Text, 5, 8, 40, 4));
        let merged = merge_changed_regions(vec![a, c, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bounds, Rect::new(0, 0, 50, 15));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_element() -> impl Strategy<Value = UiElement> {
            (0usize..4, 0i32..10, 0i32..10, any::<bool>(), 0u8..3).prop_map(
                |(kind, cx, cy, focused, label)| {
                    let kind = [
                        ElementKind::Button,
                        ElementKind::Text,
                        ElementKind::Input,
                        ElementKind::Link,
                    ][kind];
                    UiElement::new(kind, Rect::new(cx * 40, cy * 40, 30, 20))
                        .with_label(format!("l{label}"))
                        .with_flags(true, true, focused)
                },
            )
        }

        fn dedup(elements: Vec<UiElement>) -> Vec<UiElement> {
            let mut seen = HashSet::new();
            elements
                .into_iter()
                .filter(|e| seen.insert(e.id.clone()))
                .collect()
        }

        fn arb_regions() -> impl Strategy<Value = Vec<ChangedRegion>> {
            prop::collection::vec((0i32..300, 0i32..300, 1u32..60, 1u32..60), 0..20).prop_map(
                |rects| {
                    rects
                        .into_iter()
                        .map(|(x, y, w, h)| {
                            ChangedRegion::added(UiElement::new(
                                ElementKind::Unknown,
                                Rect::new(x, y, w, h),
                            ))
                        })
                        .collect()
                },
            )
        }

        proptest! {
            #[test]
            fn diff_counts_match_set_difference(
                old in prop::collection::vec(arb_element(), 0..20),
                new in prop::collection::vec(arb_element(), 0..20),
            ) {
                let old = dedup(old);
                let new = dedup(new);
                let old_ids: HashSet<&str> = old.iter().map(|e| e.id.as_str()).collect();
                let new_ids: HashSet<&str> = new.iter().map(|e| e.id.as_str()).collect();

                let diff = compute_diff(old.iter(), &new, 5, Utc::now());

                prop_assert_eq!(diff.total_added, new_ids.difference(&old_ids).count());
                prop_assert_eq!(diff.total_removed, old_ids.difference(&new_ids).count());

                let expected_modified = new
                    .iter()
                    .filter(|n| {
                        old.iter()
                            .find(|o| o.id == n.id)
                            .is_some_and(|o| element_changed(o, n, 5))
                    })
                    .count();
                prop_assert_eq!(diff.total_modified, expected_modified);

                let added: HashSet<&str> = diff.added_elements().map(|e| e.id.as_str()).collect();
                let removed: HashSet<&str> = diff.removed_elements().map(|e| e.id.as_str()).collect();
                let modified: HashSet<&str> = diff.modified_elements().map(|e| e.id.as_str()).collect();
                prop_assert!(added.is_disjoint(&removed));
                prop_assert!(added.is_disjoint(&modified));
                prop_assert!(removed.is_disjoint(&modified));
                prop_assert_eq!(added.len() + removed.len() + modified.len(),
                    diff.total_added + diff.total_removed + diff.total_modified);
            }

            #[test]
            fn merge_is_idempotent(regions in arb_regions()) {
                let once = merge_changed_regions(regions);
                let twice = merge_changed_regions(once.clone());
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn merged_regions_never_intersect(regions in arb_regions()) {
                let merged = merge_changed_regions(regions);
                for (i, a) in merged.iter().enumerate() {
                    for b in &merged[i + 1..] {
                        prop_assert!(!a.bounds.intersects(&b.bounds));
                    }
                }
            }
        }
    }
}
