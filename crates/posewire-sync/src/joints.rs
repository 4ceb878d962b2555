//! Joint-session consumer: mirrors hand and head positions onto a rig.

use posewire_net::{JointMessage, Message};

use crate::reconciler::{Consumer, TickReport};
use crate::sink::{Joint, JointRig};

/// Overwrites every joint with each snapshot. No tolerance, no registry.
pub struct JointMirror<R: JointRig> {
    rig: R,
    last: Option<JointMessage>,
}

impl<R: JointRig> JointMirror<R> {
    pub fn new(rig: R) -> Self {
        Self { rig, last: None }
    }

    /// Most recently applied snapshot.
    pub fn last(&self) -> Option<&JointMessage> {
        self.last.as_ref()
    }

    pub fn rig(&self) -> &R {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut R {
        &mut self.rig
    }
}

impl<R: JointRig> Consumer for JointMirror<R> {
    fn apply(&mut self, message: Message, report: &mut TickReport) {
        let joints = match message {
            Message::Joints(joints) => joints,
            Message::Pose(pose) => {
                tracing::warn!("Joint mirror ignoring pose message for id {}", pose.id);
                report.ignored += 1;
                return;
            }
        };

        for joint in Joint::ALL {
            let position = match joint {
                Joint::LeftHand => joints.left_hand,
                Joint::RightHand => joints.right_hand,
                Joint::Head => joints.head,
            };
            self.rig.set_joint(joint, position);
        }
        self.last = Some(joints);
        report.joints_applied += 1;
    }
}
