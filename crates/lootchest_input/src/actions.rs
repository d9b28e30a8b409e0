use crate::logical::{ActionId, AxisId};

pub const ACTION_ORBIT: ActionId = ActionId(1);
pub const ACTION_OPEN_CHEST: ActionId = ActionId(2);
pub const ACTION_SKIP_CUT_SCENE: ActionId = ActionId(3);
pub const ACTION_REVEAL_SUCCESS: ActionId = ActionId(4);
pub const ACTION_REVEAL_FAILURE: ActionId = ActionId(5);
pub const ACTION_NEXT_CHEST: ActionId = ActionId(6);
pub const ACTION_RESET: ActionId = ActionId(7);

pub const AXIS_ZOOM: AxisId = AxisId(100);
