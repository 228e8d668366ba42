use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

id_newtype!(CampaignId);
id_newtype!(SegmentId);
id_newtype!(OperationId);
id_newtype!(TemplateId);
id_newtype!(InstanceId);
id_newtype!(SlotId);
id_newtype!(ReservationId);
id_newtype!(AgentId);
id_newtype!(UserId);
