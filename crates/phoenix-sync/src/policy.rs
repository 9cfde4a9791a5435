use parking_lot::RwLock;

use crate::triangle::Triangle;

/// Which locally authored triangles the heartbeat re-announces.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PublishPolicy {
    /// Only the first local triangle, the client's fixed signature.
    #[default]
    Signature,
    /// Every local triangle, in authoring order.
    AllLocal,
}

/// Triangles authored by this client, plus the policy deciding what gets
/// re-sent on each heartbeat.
#[derive(Debug)]
pub struct LocalTriangles {
    policy: PublishPolicy,
    authored: RwLock<Vec<Triangle>>,
}

impl LocalTriangles {
    pub fn new(signature: Triangle, policy: PublishPolicy) -> Self {
        Self {
            policy,
            authored: RwLock::new(vec![signature]),
        }
    }

    #[inline]
    pub fn policy(&self) -> PublishPolicy {
        self.policy
    }

    pub fn signature(&self) -> Triangle {
        // Constructed with one entry and only ever appended to.
        self.authored.read()[0].clone()
    }

    /// Records an additional local triangle. Duplicates are ignored.
    pub fn author(&self, triangle: Triangle) -> bool {
        let mut authored = self.authored.write();
        if authored.contains(&triangle) {
            return false;
        }
        authored.push(triangle);
        true
    }

    /// Triangles to send on the next heartbeat.
    pub fn to_publish(&self) -> Vec<Triangle> {
        let authored = self.authored.read();
        match self.policy {
            PublishPolicy::Signature => authored[..1].to_vec(),
            PublishPolicy::AllLocal => authored.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.authored.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.authored.read().is_empty()
    }
}
