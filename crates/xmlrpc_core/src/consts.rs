//! Element names of the XML-RPC grammar, shared between the parser and
//! diagnostics.

pub const METHOD_CALL: &str = "methodCall";
pub const METHOD_RESPONSE: &str = "methodResponse";
pub const METHOD_NAME: &str = "methodName";

pub const PARAMS: &str = "params";
pub const PARAM: &str = "param";
pub const FAULT: &str = "fault";

pub const VALUE: &str = "value";

// scalar elements
pub const STRING: &str = "string";
pub const INT: &str = "int";
pub const I4: &str = "i4";
pub const I8: &str = "i8";
pub const DOUBLE: &str = "double";
pub const DATETIME: &str = "dateTime.iso8601";
pub const BOOLEAN: &str = "boolean";
pub const BASE64: &str = "base64";
pub const NIL: &str = "nil";

// compound elements
pub const STRUCT: &str = "struct";
pub const MEMBER: &str = "member";
pub const NAME: &str = "name";
pub const ARRAY: &str = "array";
pub const DATA: &str = "data";

/// Members of a fault struct.
pub const FAULT_CODE: &str = "faultCode";
pub const FAULT_STRING: &str = "faultString";

/// Date-time texts mapped to the minimum value when
/// `map_zeros_date_time_to_min_value` is enabled.
pub const ZERO_DATETIMES: [&str; 4] = [
    "00000000T00:00:00",
    "0000-00-00T00:00:00Z",
    "00000000T00:00:00Z",
    "0000-00-00T00:00:00",
];
