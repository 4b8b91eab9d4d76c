use crate::annotation::model::AnnotationElement;

/// Committed annotations plus the snapshot stack used for undo.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationHistory {
    elements: Vec<AnnotationElement>,
    snapshots: Vec<Vec<AnnotationElement>>,
}

impl AnnotationHistory {
    pub fn add(&mut self, element: AnnotationElement) {
        self.snapshots.push(self.elements.clone());
        self.elements.push(element);
    }

    pub fn clear(&mut self) {
        self.snapshots.push(self.elements.clone());
        self.elements.clear();
    }

    /// Restores the collection as it was before the last mutation. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.snapshots.pop() {
            Some(previous) => {
                self.elements = previous;
                true
            }
            None => false,
        }
    }

    /// Drops elements and snapshots alike.
    pub fn reset(&mut self) {
        self.elements.clear();
        self.snapshots.clear();
    }

    pub fn elements(&self) -> &[AnnotationElement] {
        &self.elements
    }

    pub fn undo_len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
