//! Frame stack for error locations
//!
//! Streams push a frame for every type, member and list element they enter.
//! The rendered path starts at the outermost type and then follows member
//! names; nested type frames are not shown:
//!
//! ```text
//! [Type(Root), Member(children), Element, Type(Node), Member(label)]
//!   => Root.children[].label
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'r> {
    Type(&'r str),
    Member(&'r str),
    Element,
}

#[derive(Debug, Default)]
pub struct FrameStack<'r> {
    frames: Vec<Frame<'r>>,
}

impl<'r> FrameStack<'r> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: Frame<'r>) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop frames above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn path(&self) -> String {
        let mut path = String::new();
        for frame in &self.frames {
            match frame {
                Frame::Type(name) if path.is_empty() => path.push_str(name),
                Frame::Type(_) => {}
                Frame::Member(name) => {
                    path.push('.');
                    path.push_str(name);
                }
                Frame::Element => path.push_str("[]"),
            }
        }
        if path.is_empty() {
            path.push_str("(top)");
        }
        path
    }
}
