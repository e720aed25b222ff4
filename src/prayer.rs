//! The Angelus prayer text.

pub const TITLE: &str = "The Angelus";

pub const THE_ANGELUS: &str = "\
The Angel of the Lord declared unto Mary.
And she conceived of the Holy Spirit.

Hail Mary, full of grace, the Lord is with thee. Blessed art thou among women, \
and blessed is the fruit of thy womb, Jesus. Holy Mary, Mother of God, pray for \
us sinners, now and at the hour of our death. Amen.

Behold the handmaid of the Lord.
Be it done unto me according to thy word.

Hail Mary, full of grace, the Lord is with thee. Blessed art thou among women, \
and blessed is the fruit of thy womb, Jesus. Holy Mary, Mother of God, pray for \
us sinners, now and at the hour of our death. Amen.

And the Word was made flesh.
And dwelt among us.

Hail Mary, full of grace, the Lord is with thee. Blessed art thou among women, \
and blessed is the fruit of thy womb, Jesus. Holy Mary, Mother of God, pray for \
us sinners, now and at the hour of our death. Amen.

Pray for us, O holy Mother of God.
That we may be made worthy of the promises of Christ.

Let us pray. Pour forth, we beseech thee, O Lord, thy grace into our hearts; \
that we, to whom the incarnation of Christ, thy Son, was made known by the \
message of an angel, may by his passion and cross be brought to the glory of \
his resurrection. Through the same Christ our Lord. Amen.";
