//! 요소 저장소와 보조 인덱스.
//!
//! 기본 맵(id → 요소)과 삽입 순서 기록, 레이블/종류/창 인덱스를 함께 갱신한다.
//! 삽입 순서는 단조 증가 일련번호로 관리하며 FIFO 퇴출에 쓰인다.
//! 같은 ID를 다시 넣으면 기존 항목을 지우고 맨 뒤에 붙인다.

use std::collections::{BTreeMap, HashMap};

use deskstate_core::models::element::{ElementKind, UiElement};

struct Entry {
    seq: u64,
    element: UiElement,
}

/// 인덱싱된 요소 저장소
pub struct ElementStore {
    elements: HashMap<String, Entry>,
    insertion_order: BTreeMap<u64, String>,
    next_seq: u64,
    /// 소문자 레이블 → ID (삽입 순)
    by_label: HashMap<String, Vec<String>>,
    by_kind: HashMap<ElementKind, Vec<String>>,
    /// 창 제목 → ID. `index_windows`가 꺼져 있으면 비어 있다.
    by_window: HashMap<String, Vec<String>>,
    index_windows: bool,
}

impl ElementStore {
    pub fn new(index_windows: bool) -> Self {
        Self {
            elements: HashMap::new(),
            insertion_order: BTreeMap::new(),
            next_seq: 0,
            by_label: HashMap::new(),
            by_kind: HashMap::new(),
            by_window: HashMap::new(),
            index_windows,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&UiElement> {
        self.elements.get(id).map(|e| &e.element)
    }

    /// 요소 삽입. 같은 ID가 있으면 교체되어 삽입 순서 맨 뒤로 간다.
    ///
    /// 교체된 이전 요소를 반환한다.
    pub fn insert(&mut self, element: UiElement) -> Option<UiElement> {
        let previous = self.remove(&element.id);
        if let Some(prev) = &previous {
            debug_assert_eq!(
                prev.kind, element.kind,
                "종류가 다른 요소의 ID 충돌: {}",
                element.id
            );
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let id = element.id.clone();
        if let Some(label) = element.non_empty_label() {
            self.by_label
                .entry(label.to_lowercase())
                .or_default()
                .push(id.clone());
        }
        self.by_kind.entry(element.kind).or_default().push(id.clone());
        if self.index_windows {
            if let Some(title) = element.window_title.as_deref().filter(|t| !t.is_empty()) {
                self.by_window
                    .entry(title.to_string())
                    .or_default()
                    .push(id.clone());
            }
        }

        self.insertion_order.insert(seq, id.clone());
        self.elements.insert(id, Entry { seq, element });
        previous
    }

    /// 요소 제거 (모든 인덱스에서 함께 제거)
    pub fn remove(&mut self, id: &str) -> Option<UiElement> {
        let Entry { seq, element } = self.elements.remove(id)?;
        self.insertion_order.remove(&seq);

        if let Some(label) = element.non_empty_label() {
            remove_from_index(&mut self.by_label, &label.to_lowercase(), id);
        }
        remove_from_index(&mut self.by_kind, &element.kind, id);
        if let Some(title) = element.window_title.as_deref() {
            remove_from_index(&mut self.by_window, title, id);
        }

        Some(element)
    }

    /// 가장 먼저 삽입된 요소를 꺼낸다
    pub fn pop_oldest(&mut self) -> Option<UiElement> {
        let id = self.insertion_order.values().next()?.clone();
        self.remove(&id)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.insertion_order.clear();
        self.by_label.clear();
        self.by_kind.clear();
        self.by_window.clear();
    }

    /// 삽입 순서대로 순회
    pub fn iter(&self) -> impl Iterator<Item = &UiElement> {
        self.insertion_order
            .values()
            .filter_map(|id| self.elements.get(id).map(|e| &e.element))
    }

    /// 레이블 정확 일치 (대소문자 무시) 첫 요소
    pub fn first_with_label(&self, label: &str) -> Option<&UiElement> {
        self.by_label
            .get(&label.to_lowercase())
            .and_then(|ids| ids.first())
            .and_then(|id| self.get(id))
    }

    /// 종류별 요소 (삽입 순)
    pub fn of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &UiElement> {
        self.resolve(self.by_kind.get(&kind))
    }

    /// 창 제목이 정확히 일치하는 요소 (삽입 순)
    pub fn in_window(&self, title: &str) -> impl Iterator<Item = &UiElement> {
        self.resolve(self.by_window.get(title))
    }

    /// 종류별 요소 수
    pub fn kind_counts(&self) -> BTreeMap<ElementKind, usize> {
        self.by_kind
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(kind, ids)| (*kind, ids.len()))
            .collect()
    }

    pub fn indexes_windows(&self) -> bool {
        self.index_windows
    }

    fn resolve<'a>(&'a self, ids: Option<&'a Vec<String>>) -> impl Iterator<Item = &'a UiElement> {
        ids.into_iter()
            .flatten()
            .filter_map(move |id| self.get(id))
    }
}

fn remove_from_index<K, Q>(index: &mut HashMap<K, Vec<String>>, key: &Q, id: &str)
where
    K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(ids) = index.get_mut(key) {
        ids.retain(|existing| existing != id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskstate_core::models::geometry::Rect;

    fn button(label: &str, x: i32) -> UiElement {
        UiElement::new(ElementKind::Button, Rect::new(x, 0, 40, 20))
            .with_label(label)
            .with_window_title("Editor")
    }

    #[test]
    fn insert_indexes_every_dimension() {
        let mut store = ElementStore::new(true);
        let ok = button("OK", 0);
        store.insert(ok.clone());

        assert_eq!(store.len(), 1);
        assert_eq!(store.first_with_label("ok").unwrap().id, ok.id);
        assert_eq!(store.of_kind(ElementKind::Button).count(), 1);
        assert_eq!(store.in_window("Editor").count(), 1);
    }

    #[test]
    fn remove_cleans_indexes() {
        let mut store = ElementStore::new(true);
        let ok = button("OK", 0);
        store.insert(ok.clone());
        assert!(store.remove(&ok.id).is_some());

        assert!(store.is_empty());
        assert!(store.first_with_label("ok").is_none());
        assert_eq!(store.of_kind(ElementKind::Button).count(), 0);
        assert!(store.kind_counts().is_empty());
        assert!(store.remove(&ok.id).is_none());
    }

    #[test]
    fn reinsert_moves_to_back() {
        let mut store = ElementStore::new(false);
        let a = button("A", 0);
        let b = button("B", 100);
        store.insert(a.clone());
        store.insert(b.clone());
        store.insert(a.clone().with_label("A2"));

        let order: Vec<_> = store.iter().map(|e| e.id.clone()).collect();
        assert_eq!(order, vec![b.id.clone(), a.id.clone()]);
        assert_eq!(store.pop_oldest().map(|e| e.id), Some(b.id.clone()));
        store.insert(b.clone());
        // 이전 레이블 인덱스는 정리된다
        assert!(store.first_with_label("a").is_none());
        assert!(store.first_with_label("A2").is_some());
    }

    #[test]
    fn pop_oldest_is_fifo() {
        let mut store = ElementStore::new(false);
        let ids: Vec<String> = (0..3)
            .map(|i| {
                let e = button("x", i * 100);
                let id = e.id.clone();
                store.insert(e);
                id
            })
            .collect();

        assert_eq!(store.pop_oldest().unwrap().id, ids[0]);
        assert_eq!(store.pop_oldest().unwrap().id, ids[1]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_label_not_indexed() {
        let mut store = ElementStore::new(false);
        store.insert(UiElement::new(ElementKind::Text, Rect::new(0, 0, 5, 5)).with_label(""));
        assert!(store.first_with_label("").is_none());
    }

    #[test]
    fn window_index_disabled() {
        let mut store = ElementStore::new(false);
        store.insert(button("OK", 0));
        assert_eq!(store.in_window("Editor").count(), 0);
        assert!(!store.indexes_windows());
    }

    #[test]
    fn label_index_keeps_first_inserted() {
        let mut store = ElementStore::new(false);
        let first = button("Save", 0);
        let second = button("save", 200);
        store.insert(first.clone());
        store.insert(second);
        assert_eq!(store.first_with_label("SAVE").unwrap().id, first.id);
    }
}
