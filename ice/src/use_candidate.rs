use stun::attributes::ATTR_USE_CANDIDATE;
use stun::message::*;

/// UseCandidateAttr represents USE-CANDIDATE attribute.
#[derive(Default, Debug, Copy, Clone)]
pub struct UseCandidateAttr;

impl Setter for UseCandidateAttr {
    /// add_to adds USE-CANDIDATE attribute to the message.
    fn add_to(&self, m: &mut Message) -> Result<(), stun::Error> {
        m.add(ATTR_USE_CANDIDATE, &[]);
        Ok(())
    }
}

impl UseCandidateAttr {
    pub fn new() -> Self {
        UseCandidateAttr
    }

    /// is_set returns true if the USE-CANDIDATE attribute is present.
    pub fn is_set(m: &Message) -> bool {
        m.get(ATTR_USE_CANDIDATE).is_ok()
    }
}
