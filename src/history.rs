use crate::params::GlitchParams;

#[derive(Debug, Clone)]
pub struct ParamHistory {
    past: Vec<GlitchParams>,
    present: GlitchParams,
    future: Vec<GlitchParams>,
}

impl ParamHistory {
    pub fn new(initial: GlitchParams) -> Self {
        Self {
            past: Vec::new(),
            present: initial,
            future: Vec::new(),
        }
    }

    pub fn present(&self) -> &GlitchParams {
        &self.present
    }

    /// Update the present value without recording it (slider drag in progress).
    pub fn set_live(&mut self, params: GlitchParams) {
        self.present = params;
    }

    /// Record `params` as a new history entry. Clears the redo stack.
    pub fn commit(&mut self, params: GlitchParams) {
        if params == self.present {
            return;
        }
        let previous = std::mem::replace(&mut self.present, params);
        self.past.push(previous);
        self.future.clear();
    }

    /// Push the present onto the undo stack before a batch of live edits.
    pub fn snapshot(&mut self) {
        self.past.push(self.present.clone());
        self.future.clear();
    }

    pub fn undo(&mut self) -> Option<&GlitchParams> {
        let previous = self.past.pop()?;
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        Some(&self.present)
    }

    pub fn redo(&mut self) -> Option<&GlitchParams> {
        let next = self.future.pop()?;
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        Some(&self.present)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}
