use hickory_proto::op::{Message, MessageType, ResponseCode};

/// Bare response to `query` carrying `rcode`, with the question echoed.
pub fn error_response(query: &Message, rcode: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true)
        .set_checking_disabled(query.checking_disabled())
        .set_response_code(rcode)
        .add_queries(query.queries().iter().cloned());
    response
}

/// Smallest TTL across the answer section; `None` when there are no answers.
pub fn min_answer_ttl(message: &Message) -> Option<u32> {
    message.answers().iter().map(|r| r.ttl()).min()
}
