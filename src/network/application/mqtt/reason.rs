//! MQTT v5 reason codes.

/// A reason code as carried by CONNACK, PUBACK, SUBACK, UNSUBACK and
/// DISCONNECT.
///
/// The same byte means different things in different packets (`0x00` is
/// "Success" in a PUBACK and "Normal disconnection" in a DISCONNECT, `0x01`
/// and `0x02` are granted QoS levels in a SUBACK). The variant names follow
/// the most common meaning.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReasonCode {
    /// Success, normal disconnection, or granted QoS 0.
    Success = 0x00,
    /// Subscription granted at QoS 1.
    GrantedQoS1 = 0x01,
    /// Subscription granted at QoS 2.
    GrantedQoS2 = 0x02,
    /// Disconnect and publish the will message.
    DisconnectWithWillMessage = 0x04,
    /// Accepted, but nobody is subscribed.
    NoMatchingSubscribers = 0x10,
    /// Unsubscribe for a filter that was not subscribed.
    NoSubscriptionExisted = 0x11,
    /// Continue the authentication exchange.
    ContinueAuthentication = 0x18,
    /// Start re-authentication.
    ReAuthenticate = 0x19,
    /// Unspecified error.
    UnspecifiedError = 0x80,
    /// The packet could not be parsed.
    MalformedPacket = 0x81,
    /// The packet broke the protocol rules.
    ProtocolError = 0x82,
    /// Valid packet, but refused by this implementation.
    ImplementationSpecificError = 0x83,
    /// Protocol version not supported.
    UnsupportedProtocolVersion = 0x84,
    /// Client identifier rejected.
    ClientIdentifierNotValid = 0x85,
    /// Bad user name or password.
    BadUserNameOrPassword = 0x86,
    /// Not authorized.
    NotAuthorized = 0x87,
    /// Server unavailable.
    ServerUnavailable = 0x88,
    /// Server busy.
    ServerBusy = 0x89,
    /// Client banned.
    Banned = 0x8A,
    /// Server shutting down.
    ServerShuttingDown = 0x8B,
    /// Authentication method not supported.
    BadAuthenticationMethod = 0x8C,
    /// Keep-alive expired.
    KeepAliveTimeout = 0x8D,
    /// Another connection took over the session.
    SessionTakenOver = 0x8E,
    /// Topic filter rejected.
    TopicFilterInvalid = 0x8F,
    /// Topic name rejected.
    TopicNameInvalid = 0x90,
    /// Packet identifier already in use.
    PacketIdentifierInUse = 0x91,
    /// Packet identifier unknown.
    PacketIdentifierNotFound = 0x92,
    /// Too many unacknowledged publishes.
    ReceiveMaximumExceeded = 0x93,
    /// Topic alias out of range.
    TopicAliasInvalid = 0x94,
    /// Packet exceeds the maximum packet size.
    PacketTooLarge = 0x95,
    /// Message rate too high.
    MessageRateTooHigh = 0x96,
    /// Quota exceeded.
    QuotaExceeded = 0x97,
    /// Disconnected by an administrator.
    AdministrativeAction = 0x98,
    /// Payload does not match its format indicator.
    PayloadFormatInvalid = 0x99,
    /// Retained messages not supported.
    RetainNotSupported = 0x9A,
    /// QoS level not supported.
    QoSNotSupported = 0x9B,
    /// Use another server temporarily.
    UseAnotherServer = 0x9C,
    /// Server moved permanently.
    ServerMoved = 0x9D,
    /// Shared subscriptions not supported.
    SharedSubscriptionsNotSupported = 0x9E,
    /// Connection rate exceeded.
    ConnectionRateExceeded = 0x9F,
    /// Maximum connection time reached.
    MaximumConnectTime = 0xA0,
    /// Subscription identifiers not supported.
    SubscriptionIdentifiersNotSupported = 0xA1,
    /// Wildcard subscriptions not supported.
    WildcardSubscriptionsNotSupported = 0xA2,
}

impl ReasonCode {
    /// `0x00` in a DISCONNECT.
    pub const NORMAL_DISCONNECTION: ReasonCode = ReasonCode::Success;
    /// `0x00` in a SUBACK.
    pub const GRANTED_QOS0: ReasonCode = ReasonCode::Success;

    /// Codes of `0x80` and above report a failure.
    pub fn is_error(self) -> bool {
        self as u8 >= 0x80
    }
}

impl From<ReasonCode> for u8 {
    fn from(code: ReasonCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for ReasonCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ReasonCode::*;
        let code = match value {
            0x00 => Success,
            0x01 => GrantedQoS1,
            0x02 => GrantedQoS2,
            0x04 => DisconnectWithWillMessage,
            0x10 => NoMatchingSubscribers,
            0x11 => NoSubscriptionExisted,
            0x18 => ContinueAuthentication,
            0x19 => ReAuthenticate,
            0x80 => UnspecifiedError,
            0x81 => MalformedPacket,
            0x82 => ProtocolError,
            0x83 => ImplementationSpecificError,
            0x84 => UnsupportedProtocolVersion,
            0x85 => ClientIdentifierNotValid,
            0x86 => BadUserNameOrPassword,
            0x87 => NotAuthorized,
            0x88 => ServerUnavailable,
            0x89 => ServerBusy,
            0x8A => Banned,
            0x8B => ServerShuttingDown,
            0x8C => BadAuthenticationMethod,
            0x8D => KeepAliveTimeout,
            0x8E => SessionTakenOver,
            0x8F => TopicFilterInvalid,
            0x90 => TopicNameInvalid,
            0x91 => PacketIdentifierInUse,
            0x92 => PacketIdentifierNotFound,
            0x93 => ReceiveMaximumExceeded,
            0x94 => TopicAliasInvalid,
            0x95 => PacketTooLarge,
            0x96 => MessageRateTooHigh,
            0x97 => QuotaExceeded,
            0x98 => AdministrativeAction,
            0x99 => PayloadFormatInvalid,
            0x9A => RetainNotSupported,
            0x9B => QoSNotSupported,
            0x9C => UseAnotherServer,
            0x9D => ServerMoved,
            0x9E => SharedSubscriptionsNotSupported,
            0x9F => ConnectionRateExceeded,
            0xA0 => MaximumConnectTime,
            0xA1 => SubscriptionIdentifiersNotSupported,
            0xA2 => WildcardSubscriptionsNotSupported,
            _ => return Err(()),
        };
        Ok(code)
    }
}
