//! Well-known names shared by the detector, the plan builder and the emitter.
//!
//! Staleness detection only recognises previously generated code through these
//! literals, so they must never vary between runs.

/// Name of the generated `#region`.
pub const REGION_NAME: &str = "NotifyPropertyChangedGenerator";

/// Name of the shared comparison-guarded setter helper.
pub const SETTER_HELPER_NAME: &str = "SetProperty";

/// Name of the change-notification event.
pub const EVENT_NAME: &str = "PropertyChanged";

/// Delegate type of the change-notification event.
pub const EVENT_HANDLER_TYPE: &str = "PropertyChangedEventHandler";

/// Fully qualified delegate type of the change-notification event.
pub const EVENT_HANDLER_TYPE_QUALIFIED: &str = "System.ComponentModel.PropertyChangedEventHandler";

/// Payload type cached once per generated property.
pub const EVENT_ARGS_TYPE: &str = "PropertyChangedEventArgs";

/// Fully qualified payload type.
pub const EVENT_ARGS_TYPE_QUALIFIED: &str = "System.ComponentModel.PropertyChangedEventArgs";

/// Change-notification capability (interface) short name.
pub const INTERFACE_NAME: &str = "INotifyPropertyChanged";

/// Change-notification capability (interface) fully qualified name.
pub const INTERFACE_NAME_QUALIFIED: &str = "System.ComponentModel.INotifyPropertyChanged";

/// Namespace the generated members depend on.
pub const COMPONENT_MODEL_NAMESPACE: &str = "System.ComponentModel";

/// Suffix marker types carry and marker usages may omit.
pub const ATTRIBUTE_SUFFIX: &str = "Attribute";

/// Default short name of the inclusion marker.
pub const DEFAULT_INCLUDE_MARKER: &str = "Notify";

/// Default short name of the exclusion marker.
pub const DEFAULT_EXCLUDE_MARKER: &str = "NonNotify";

/// Parameter name of the naming-convention marker argument.
pub const NAMING_ARGUMENT: &str = "namingConvention";

/// Parameter name of the compare-method marker argument.
pub const COMPARE_ARGUMENT: &str = "compareMethod";

/// Enum type name qualifying naming-convention enumerants.
pub const NAMING_ENUM: &str = "NamingConvention";

/// Enum type name qualifying compare-method enumerants.
pub const COMPARE_ENUM: &str = "CompareMethod";

/// Diagnostic id reported for classes that need regeneration.
pub const DIAGNOSTIC_ID: &str = REGION_NAME;

/// Diagnostic title.
pub const DIAGNOSTIC_TITLE: &str = "Generate notify property from NotifyAttribute.";

/// Diagnostic message.
pub const DIAGNOSTIC_MESSAGE: &str = "Notify property is not generated yet.";

/// Returns true when `name` names the change-notification capability.
pub fn is_change_notification_interface(name: &str) -> bool {
    let name = name.trim().trim_start_matches("global::");
    name == INTERFACE_NAME || name == INTERFACE_NAME_QUALIFIED
}

/// Returns true when `type_name` names the change-notification event delegate.
pub fn is_event_handler_type(type_name: &str) -> bool {
    let type_name = type_name.trim().trim_start_matches("global::");
    type_name == EVENT_HANDLER_TYPE || type_name == EVENT_HANDLER_TYPE_QUALIFIED
}

/// Returns true when `type_name` names the cached event-args type.
pub fn is_event_args_type(type_name: &str) -> bool {
    let type_name = type_name.trim().trim_start_matches("global::");
    type_name == EVENT_ARGS_TYPE || type_name == EVENT_ARGS_TYPE_QUALIFIED
}
