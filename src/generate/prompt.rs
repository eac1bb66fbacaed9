/// Marketing-copy instructions sent ahead of every content row.
const TEMPLATE: &str = "Bạn là chuyên gia viết nội dung quảng cáo bán hàng. \
Hãy viết lại nội dung dưới đây thành một bài quảng cáo bằng tiếng Việt, \
tối đa 500 ký tự, bao gồm cả hashtag và link mua hàng. \
Chỉ trả về nội dung quảng cáo, không giải thích hay bình luận gì thêm.\n\n\
Nội dung:\n";

pub fn build_prompt(content: &str) -> String {
    format!("{TEMPLATE}{content}")
}
