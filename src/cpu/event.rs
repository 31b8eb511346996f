#[derive(Debug, Eq, PartialEq)]
pub enum CPUEvent {
    Nothing,
    Halt,
    Skip,
    FlowChange(u16),
}
